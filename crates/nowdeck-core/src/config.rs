//! Behaviour-defining cadences.
//!
//! Every value here changes what the user experiences (how long a hold
//! takes, how stale the screen may get), so they are configuration rather
//! than incidental delays.

/// Gesture, overlay and power-management timings for the interactive loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InputTimings {
    /// Raw level must be stable this long before an edge is accepted.
    pub debounce_ms: u64,
    /// Prev/next hold time before volume repeat starts.
    pub volume_repeat_delay_ms: u64,
    /// Interval between volume steps while held.
    pub volume_repeat_interval_ms: u64,
    /// Percent added/removed per volume step.
    pub volume_step: i8,
    /// Play hold time that saves the current track.
    pub like_hold_ms: u64,
    /// How long transient confirmation popups stay up.
    pub overlay_ms: u64,
    /// Idle time before the backlight is switched off.
    pub sleep_timeout_ms: u64,
    /// Combo hold time before the logout warning shows.
    pub combo_warning_ms: u64,
    /// Combo hold time from which release logs out.
    pub combo_logout_ms: u64,
    /// Combo hold time at which the factory reset fires.
    pub combo_factory_reset_ms: u64,
}

impl Default for InputTimings {
    fn default() -> Self {
        Self {
            debounce_ms: 30,
            volume_repeat_delay_ms: 800,
            volume_repeat_interval_ms: 500,
            volume_step: 10,
            like_hold_ms: 3_000,
            overlay_ms: 3_000,
            sleep_timeout_ms: 300_000,
            combo_warning_ms: 2_000,
            combo_logout_ms: 10_000,
            combo_factory_reset_ms: 20_000,
        }
    }
}

impl InputTimings {
    pub const fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub const fn with_sleep_timeout_ms(mut self, sleep_timeout_ms: u64) -> Self {
        self.sleep_timeout_ms = sleep_timeout_ms;
        self
    }
}

/// Network cadence for the background worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WorkerTimings {
    /// Regular player-state poll interval.
    pub poll_interval_ms: u64,
    /// Pause after a transport command before re-polling.
    pub command_settle_ms: u64,
    /// Pause after saving a track.
    pub like_settle_ms: u64,
    /// Delay between worker cycles.
    pub cycle_ms: u64,
    /// Bounded wait for the shared-state lock.
    pub lock_timeout_ms: u64,
    /// Progress beyond which "previous" restarts the track instead.
    pub smart_previous_threshold_ms: u64,
    /// Interval between token refresh attempts during first-time login.
    pub login_poll_ms: u64,
}

impl Default for WorkerTimings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            command_settle_ms: 200,
            like_settle_ms: 500,
            cycle_ms: 200,
            lock_timeout_ms: 100,
            smart_previous_threshold_ms: 10_000,
            login_poll_ms: 5_000,
        }
    }
}

impl WorkerTimings {
    pub const fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }
}

/// Top-level configuration shared by the firmware and tests.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeckConfig {
    pub input: InputTimings,
    pub worker: WorkerTimings,
    /// Whether the player projection should carry album artwork URLs.
    pub artwork_enabled: bool,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            input: InputTimings::default(),
            worker: WorkerTimings::default(),
            artwork_enabled: true,
        }
    }
}

impl DeckConfig {
    pub const fn with_artwork(mut self, artwork_enabled: bool) -> Self {
        self.artwork_enabled = artwork_enabled;
        self
    }
}
