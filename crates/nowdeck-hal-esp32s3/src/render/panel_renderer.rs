use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiBus};
use log::debug;
use nowdeck_core::{
    render::{PopupTone, RenderAdapter},
    snapshot::PlaybackSnapshot,
};

use crate::platform::{
    display::{DisplayError, SharpDisplay},
    panel::FrameBuffer,
};

use super::{FrameRenderer, Screen, now_playing::VisibleState};

/// Memory-LCD backed [`RenderAdapter`].
///
/// Remembers what the last now-playing frame showed so a snapshot with no
/// visible change does not clock a full frame out over SPI.
pub struct PanelRenderer<SPI, DISP, EMD, CS, D, P> {
    display: SharpDisplay<SPI, DISP, EMD, CS, D>,
    frame: &'static mut FrameBuffer,
    painter: P,
    shown: Option<VisibleState>,
    output_on: bool,
}

impl<SPI, DISP, EMD, CS, D, P> PanelRenderer<SPI, DISP, EMD, CS, D, P>
where
    SPI: SpiBus<u8>,
    DISP: OutputPin,
    EMD: OutputPin,
    CS: OutputPin,
    D: DelayNs,
    P: FrameRenderer,
{
    pub fn new(
        display: SharpDisplay<SPI, DISP, EMD, CS, D>,
        frame: &'static mut FrameBuffer,
        painter: P,
    ) -> Self {
        Self {
            display,
            frame,
            painter,
            shown: None,
            output_on: true,
        }
    }

    fn present(
        &mut self,
        screen: Screen<'_>,
    ) -> Result<(), DisplayError<SPI::Error, DISP::Error, EMD::Error, CS::Error>> {
        self.painter.render(screen, self.frame);
        self.display.flush_frame(self.frame)
    }
}

impl<SPI, DISP, EMD, CS, D, P> RenderAdapter for PanelRenderer<SPI, DISP, EMD, CS, D, P>
where
    SPI: SpiBus<u8>,
    DISP: OutputPin,
    EMD: OutputPin,
    CS: OutputPin,
    D: DelayNs,
    P: FrameRenderer,
    SPI::Error: core::fmt::Debug,
    DISP::Error: core::fmt::Debug,
    EMD::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    type Error = DisplayError<SPI::Error, DISP::Error, EMD::Error, CS::Error>;

    fn show_splash(&mut self) -> Result<(), Self::Error> {
        self.shown = None;
        self.present(Screen::Splash)
    }

    fn show_connecting(&mut self) -> Result<(), Self::Error> {
        self.shown = None;
        self.present(Screen::Connecting)
    }

    fn show_qr(&mut self, data: &str, title: &str, footer: &str) -> Result<(), Self::Error> {
        self.shown = None;
        self.present(Screen::Login {
            url: data,
            title,
            footer,
        })
    }

    fn show_popup(&mut self, text: &str, tone: PopupTone) -> Result<(), Self::Error> {
        self.shown = None;
        self.present(Screen::Popup { text, tone })
    }

    fn clear_screen(&mut self) -> Result<(), Self::Error> {
        self.shown = None;
        self.frame.fill(false);
        self.display.clear_all()
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), Self::Error> {
        if self.output_on == on {
            return Ok(());
        }
        debug!("render: panel output on={}", on);
        self.output_on = on;
        self.display.set_output(on)
    }

    fn render_snapshot(&mut self, snapshot: &PlaybackSnapshot) -> Result<(), Self::Error> {
        let visible = VisibleState::of(snapshot);
        if self.shown.as_ref() == Some(&visible) {
            return Ok(());
        }
        self.present(Screen::NowPlaying(snapshot))?;
        self.shown = Some(visible);
        Ok(())
    }
}
