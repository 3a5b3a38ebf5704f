pub mod now_playing;
pub mod panel_renderer;

use nowdeck_core::{render::PopupTone, snapshot::PlaybackSnapshot};

use crate::platform::panel::FrameBuffer;

/// Everything the panel can show, one full frame each.
#[derive(Debug, Clone, Copy)]
pub enum Screen<'a> {
    Splash,
    Connecting,
    Login {
        url: &'a str,
        title: &'a str,
        footer: &'a str,
    },
    Popup {
        text: &'a str,
        tone: PopupTone,
    },
    NowPlaying(&'a PlaybackSnapshot),
}

pub trait FrameRenderer {
    fn render(&mut self, screen: Screen<'_>, frame: &mut FrameBuffer);
}
