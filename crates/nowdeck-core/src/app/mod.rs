//! Interactive loop: gestures, sleep/wake, popups and dirty-driven redraws.

use core::fmt::Write;

use heapless::String;
use log::{debug, info, warn};

use crate::{
    commands::{CommandQueue, PlayIntent},
    config::InputTimings,
    credentials::{CredentialStore, SharedStore},
    http::Connectivity,
    input::{
        ButtonId, ButtonLevels, ButtonPanel,
        gesture::{ButtonEdge, ButtonTracker, ComboAction, ComboBand, ComboState, ComboThresholds},
    },
    render::{PopupTone, RenderAdapter, report},
    shared::SharedPlayback,
    snapshot::PlaybackSnapshot,
};

pub const SAVED_TEXT: &str = "SAVED TO LIKED";
pub const LOGGING_OUT_TEXT: &str = "LOGGING OUT...";
pub const FACTORY_RESET_TEXT: &str = "FACTORY RESET!";
const POPUP_BYTES: usize = 24;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RestartReason {
    Logout,
    FactoryReset,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickResult {
    Idle,
    Rendered,
    /// Persistence is done and the notice is on screen; the caller reboots.
    RestartRequested(RestartReason),
}

#[derive(Clone, Copy, Debug, Default)]
struct TickEdges {
    previous: Option<ButtonEdge>,
    play: Option<ButtonEdge>,
    next: Option<ButtonEdge>,
}

impl TickEdges {
    fn any_pressed(&self) -> bool {
        [self.previous, self.play, self.next]
            .iter()
            .any(|edge| matches!(edge, Some(ButtonEdge::Pressed)))
    }
}

#[cfg(test)]
mod tests;

pub struct DeckApp<'a, B, R, S, N>
where
    B: ButtonPanel,
    R: RenderAdapter,
    S: CredentialStore,
    N: Connectivity,
{
    buttons: B,
    renderer: R,
    net: N,
    shared: &'a SharedPlayback,
    commands: &'a CommandQueue,
    store: &'a SharedStore<S>,
    timings: InputTimings,
    previous: ButtonTracker,
    play: ButtonTracker,
    next: ButtonTracker,
    combo: ComboState,
    displayed: PlaybackSnapshot,
    last_activity_ms: Option<u64>,
    sleeping: bool,
    overlay_until_ms: Option<u64>,
    pending_redraw: bool,
    restart: Option<RestartReason>,
}

impl<'a, B, R, S, N> DeckApp<'a, B, R, S, N>
where
    B: ButtonPanel,
    R: RenderAdapter,
    S: CredentialStore,
    N: Connectivity,
{
    pub fn new(
        buttons: B,
        renderer: R,
        net: N,
        shared: &'a SharedPlayback,
        commands: &'a CommandQueue,
        store: &'a SharedStore<S>,
        timings: InputTimings,
    ) -> Self {
        Self {
            buttons,
            renderer,
            net,
            shared,
            commands,
            store,
            timings,
            previous: ButtonTracker::new(),
            play: ButtonTracker::new(),
            next: ButtonTracker::new(),
            combo: ComboState::new(),
            displayed: PlaybackSnapshot::empty(),
            last_activity_ms: None,
            sleeping: false,
            overlay_until_ms: None,
            pending_redraw: true,
            restart: None,
        }
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn restart_reason(&self) -> Option<RestartReason> {
        self.restart
    }

    /// Last snapshot handed to the renderer (or absorbed while asleep).
    pub fn displayed(&self) -> &PlaybackSnapshot {
        &self.displayed
    }

    pub fn buttons_mut(&mut self) -> &mut B {
        &mut self.buttons
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    fn combo_thresholds(&self) -> ComboThresholds {
        ComboThresholds {
            warning_ms: self.timings.combo_warning_ms,
            logout_ms: self.timings.combo_logout_ms,
            factory_reset_ms: self.timings.combo_factory_reset_ms,
        }
    }

    fn tracker_mut(&mut self, id: ButtonId) -> &mut ButtonTracker {
        match id {
            ButtonId::Previous => &mut self.previous,
            ButtonId::Play => &mut self.play,
            ButtonId::Next => &mut self.next,
        }
    }
}

include!("input.rs");
include!("runtime.rs");
