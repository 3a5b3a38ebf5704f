use embedded_hal::digital::InputPin;

use nowdeck_core::input::{ButtonLevels, ButtonPanel};

#[derive(Debug, Clone, Copy)]
pub struct ButtonConfig {
    active_low: bool,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self { active_low: true }
    }
}

impl ButtonConfig {
    pub const fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }
}

#[derive(Debug)]
pub enum ButtonInputError<PrevErr, PlayErr, NextErr> {
    Previous(PrevErr),
    Play(PlayErr),
    Next(NextErr),
}

/// Three momentary switches sampled as raw levels. Debouncing happens in
/// the gesture engine.
#[derive(Debug)]
pub struct GpioButtons<PREV, PLAY, NEXT> {
    previous: PREV,
    play: PLAY,
    next: NEXT,
    config: ButtonConfig,
}

impl<PREV, PLAY, NEXT> GpioButtons<PREV, PLAY, NEXT>
where
    PREV: InputPin,
    PLAY: InputPin,
    NEXT: InputPin,
{
    pub const fn new(previous: PREV, play: PLAY, next: NEXT, config: ButtonConfig) -> Self {
        Self {
            previous,
            play,
            next,
            config,
        }
    }

    fn pressed(&self, high: bool) -> bool {
        if self.config.active_low { !high } else { high }
    }
}

impl<PREV, PLAY, NEXT> ButtonPanel for GpioButtons<PREV, PLAY, NEXT>
where
    PREV: InputPin,
    PLAY: InputPin,
    NEXT: InputPin,
{
    type Error = ButtonInputError<PREV::Error, PLAY::Error, NEXT::Error>;

    fn sample(&mut self) -> Result<ButtonLevels, Self::Error> {
        let previous = self.previous.is_high().map_err(ButtonInputError::Previous)?;
        let play = self.play.is_high().map_err(ButtonInputError::Play)?;
        let next = self.next.is_high().map_err(ButtonInputError::Next)?;
        Ok(ButtonLevels {
            previous: self.pressed(previous),
            play: self.pressed(play),
            next: self.pressed(next),
        })
    }
}
