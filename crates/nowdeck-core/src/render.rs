//! Render adapter seam. Drawing itself lives in the board crate.

use log::warn;

use crate::snapshot::PlaybackSnapshot;

/// Colour tag for transient popups; panels without colour map these to
/// their own emphasis (frame style, inversion).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PopupTone {
    /// Logout countdown.
    Warning,
    /// Factory reset countdown and confirmation.
    Danger,
    /// Positive confirmation such as a saved track.
    Accent,
    Info,
}

/// Screen operations driven from the interactive loop and the boot session.
///
/// Every call must be idempotent. `render_snapshot` is only invoked when the
/// shared state was marked dirty, and may be skipped for any number of ticks.
pub trait RenderAdapter {
    type Error: core::fmt::Debug;

    fn show_splash(&mut self) -> Result<(), Self::Error>;
    fn show_connecting(&mut self) -> Result<(), Self::Error>;
    fn show_qr(&mut self, data: &str, title: &str, footer: &str) -> Result<(), Self::Error>;
    fn show_popup(&mut self, text: &str, tone: PopupTone) -> Result<(), Self::Error>;
    fn clear_screen(&mut self) -> Result<(), Self::Error>;
    fn set_backlight(&mut self, on: bool) -> Result<(), Self::Error>;
    fn render_snapshot(&mut self, snapshot: &PlaybackSnapshot) -> Result<(), Self::Error>;
}

/// Logs a failed draw; the next dirty tick redraws anyway.
pub(crate) fn report<E: core::fmt::Debug>(what: &str, result: Result<(), E>) {
    if let Err(err) = result {
        warn!("render: {} failed err={:?}", what, err);
    }
}
