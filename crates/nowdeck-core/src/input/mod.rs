//! Button sampling and gesture tracking.

pub mod gesture;
pub mod mock;

/// The three momentary controls, left to right.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonId {
    Previous,
    Play,
    Next,
}

/// Instantaneous pressed state of every control (`true` = pressed).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ButtonLevels {
    pub previous: bool,
    pub play: bool,
    pub next: bool,
}

impl ButtonLevels {
    pub const RELEASED: Self = Self {
        previous: false,
        play: false,
        next: false,
    };

    pub const fn with(mut self, id: ButtonId, pressed: bool) -> Self {
        match id {
            ButtonId::Previous => self.previous = pressed,
            ButtonId::Play => self.play = pressed,
            ButtonId::Next => self.next = pressed,
        }
        self
    }
}

/// Polled button source. Levels are raw; debouncing happens in the app.
pub trait ButtonPanel {
    type Error;

    fn sample(&mut self) -> Result<ButtonLevels, Self::Error>;
}
