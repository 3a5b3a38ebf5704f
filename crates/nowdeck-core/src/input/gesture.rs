//! Per-button debounce and hold tracking, plus the prev+next combo clock.

/// Debounced transition reported by [`ButtonTracker::update`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonEdge {
    Pressed,
    Released {
        held_ms: u64,
        /// No hold action, combo or wake consumed this press.
        tap: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ButtonTracker {
    raw: bool,
    raw_since_ms: u64,
    pressed: bool,
    pressed_at_ms: u64,
    last_repeat_ms: Option<u64>,
    hold_fired: bool,
    suppressed: bool,
    swallow_tap: bool,
}

impl ButtonTracker {
    pub const fn new() -> Self {
        Self {
            raw: false,
            raw_since_ms: 0,
            pressed: false,
            pressed_at_ms: 0,
            last_repeat_ms: None,
            hold_fired: false,
            suppressed: false,
            swallow_tap: false,
        }
    }

    /// Feeds one raw sample. A level change is accepted once it has been
    /// stable for `debounce_ms`.
    pub fn update(&mut self, raw: bool, now_ms: u64, debounce_ms: u64) -> Option<ButtonEdge> {
        if raw != self.raw {
            self.raw = raw;
            self.raw_since_ms = now_ms;
        }
        if self.raw == self.pressed || now_ms.saturating_sub(self.raw_since_ms) < debounce_ms {
            return None;
        }

        self.pressed = self.raw;
        if self.pressed {
            self.pressed_at_ms = now_ms;
            self.last_repeat_ms = None;
            self.hold_fired = false;
            self.suppressed = false;
            self.swallow_tap = false;
            return Some(ButtonEdge::Pressed);
        }

        let held_ms = now_ms.saturating_sub(self.pressed_at_ms);
        let tap = !(self.hold_fired || self.suppressed || self.swallow_tap);
        Some(ButtonEdge::Released { held_ms, tap })
    }

    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn held_ms(&self, now_ms: u64) -> Option<u64> {
        self.pressed
            .then(|| now_ms.saturating_sub(self.pressed_at_ms))
    }

    /// Latches the one-shot hold action; `true` only the first time per press.
    pub fn fire_hold(&mut self) -> bool {
        if !self.pressed || self.hold_fired {
            return false;
        }
        self.hold_fired = true;
        true
    }

    /// Whether a repeat step is due: the first at `delay_ms` of hold, then
    /// every `interval_ms`. Records the step when due.
    pub fn repeat_due(&mut self, now_ms: u64, delay_ms: u64, interval_ms: u64) -> bool {
        if self.suppressed {
            return false;
        }
        let Some(held) = self.held_ms(now_ms) else {
            return false;
        };
        let due = match self.last_repeat_ms {
            None => held >= delay_ms,
            Some(last) => now_ms.saturating_sub(last) >= interval_ms,
        };
        if due {
            self.last_repeat_ms = Some(now_ms);
            self.hold_fired = true;
        }
        due
    }

    /// Takes this press out of tap and repeat handling until release.
    pub fn suppress(&mut self) {
        if self.pressed {
            self.suppressed = true;
        }
    }

    /// The current press woke the display; its release is not a tap.
    pub fn swallow_tap(&mut self) {
        if self.pressed {
            self.swallow_tap = true;
        }
    }
}

/// Countdown band of a held combo.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComboBand {
    Arming,
    LogoutPending,
    ResetPending,
    FactoryReset,
}

/// What releasing (or continuing to hold) the combo amounts to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComboAction {
    None,
    Logout,
    FactoryReset,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ComboThresholds {
    pub warning_ms: u64,
    pub logout_ms: u64,
    pub factory_reset_ms: u64,
}

impl ComboThresholds {
    pub const fn band(&self, held_ms: u64) -> ComboBand {
        if held_ms >= self.factory_reset_ms {
            ComboBand::FactoryReset
        } else if held_ms >= self.logout_ms {
            ComboBand::ResetPending
        } else if held_ms >= self.warning_ms {
            ComboBand::LogoutPending
        } else {
            ComboBand::Arming
        }
    }

    /// Whole seconds left in the current countdown band.
    pub const fn seconds_left(&self, held_ms: u64) -> u64 {
        match self.band(held_ms) {
            ComboBand::LogoutPending => (self.logout_ms - held_ms) / 1_000,
            ComboBand::ResetPending => (self.factory_reset_ms - held_ms) / 1_000,
            _ => 0,
        }
    }

    pub const fn release_action(&self, held_ms: u64) -> ComboAction {
        match self.band(held_ms) {
            ComboBand::ResetPending => ComboAction::Logout,
            ComboBand::FactoryReset => ComboAction::FactoryReset,
            _ => ComboAction::None,
        }
    }
}

/// Clock and countdown memory for a prev+next hold.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ComboState {
    started_ms: Option<u64>,
    last_bucket: Option<(ComboBand, u64)>,
}

impl ComboState {
    pub const fn new() -> Self {
        Self {
            started_ms: None,
            last_bucket: None,
        }
    }

    pub const fn is_armed(&self) -> bool {
        self.started_ms.is_some()
    }

    /// Arms on first call; returns the elapsed hold.
    pub fn hold(&mut self, now_ms: u64) -> u64 {
        let started = *self.started_ms.get_or_insert(now_ms);
        now_ms.saturating_sub(started)
    }

    /// `true` when the band or the displayed second changed since the last
    /// call, so the countdown popup needs redrawing.
    pub fn bucket_changed(&mut self, band: ComboBand, seconds_left: u64) -> bool {
        let bucket = Some((band, seconds_left));
        if self.last_bucket == bucket {
            return false;
        }
        self.last_bucket = bucket;
        true
    }

    /// Disarms and returns the total hold, if the combo was armed.
    pub fn release(&mut self, now_ms: u64) -> Option<u64> {
        let started = self.started_ms.take()?;
        self.last_bucket = None;
        Some(now_ms.saturating_sub(started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBO: ComboThresholds = ComboThresholds {
        warning_ms: 2_000,
        logout_ms: 10_000,
        factory_reset_ms: 20_000,
    };

    #[test]
    fn bounce_shorter_than_debounce_is_ignored() {
        let mut button = ButtonTracker::new();
        assert_eq!(button.update(true, 0, 30), None);
        assert_eq!(button.update(false, 10, 30), None);
        assert_eq!(button.update(true, 20, 30), None);
        assert_eq!(button.update(true, 49, 30), None);
        assert_eq!(button.update(true, 50, 30), Some(ButtonEdge::Pressed));
        assert!(button.is_pressed());
    }

    #[test]
    fn short_press_releases_as_tap() {
        let mut button = ButtonTracker::new();
        button.update(true, 100, 0);
        assert_eq!(button.held_ms(300), Some(200));
        assert_eq!(
            button.update(false, 400, 0),
            Some(ButtonEdge::Released {
                held_ms: 300,
                tap: true
            })
        );
        assert!(!button.is_pressed());
        assert_eq!(button.held_ms(400), None);
    }

    #[test]
    fn repeat_starts_after_delay_then_steps_on_interval() {
        let mut button = ButtonTracker::new();
        button.update(true, 0, 0);

        let fired: std::vec::Vec<u64> = (0..=2_000)
            .step_by(100)
            .filter(|&now| button.repeat_due(now, 800, 500))
            .collect();

        assert_eq!(fired, [800, 1_300, 1_800]);
        assert!(!button.fire_hold(), "repeating press already counts as held");
        assert!(matches!(
            button.update(false, 2_000, 0),
            Some(ButtonEdge::Released { tap: false, .. })
        ));
    }

    #[test]
    fn hold_latches_once_per_press() {
        let mut button = ButtonTracker::new();
        button.update(true, 0, 0);
        assert!(button.fire_hold());
        assert!(!button.fire_hold());
        button.update(false, 3_500, 0);

        button.update(true, 4_000, 0);
        assert!(button.fire_hold());
    }

    #[test]
    fn suppressed_and_swallowed_presses_are_not_taps() {
        let mut button = ButtonTracker::new();
        button.update(true, 0, 0);
        button.swallow_tap();
        assert!(matches!(
            button.update(false, 100, 0),
            Some(ButtonEdge::Released { tap: false, .. })
        ));

        button.update(true, 200, 0);
        button.suppress();
        assert!(!button.repeat_due(2_000, 800, 500));
        assert!(matches!(
            button.update(false, 2_100, 0),
            Some(ButtonEdge::Released { tap: false, .. })
        ));
    }

    #[test]
    fn combo_bands_and_release_actions() {
        assert_eq!(COMBO.band(1_999), ComboBand::Arming);
        assert_eq!(COMBO.band(2_000), ComboBand::LogoutPending);
        assert_eq!(COMBO.seconds_left(2_500), 7);
        assert_eq!(COMBO.band(10_000), ComboBand::ResetPending);
        assert_eq!(COMBO.seconds_left(12_000), 8);
        assert_eq!(COMBO.band(20_000), ComboBand::FactoryReset);

        assert_eq!(COMBO.release_action(9_999), ComboAction::None);
        assert_eq!(COMBO.release_action(12_000), ComboAction::Logout);
        assert_eq!(COMBO.release_action(25_000), ComboAction::FactoryReset);
    }

    #[test]
    fn combo_bucket_reports_each_second_once() {
        let mut combo = ComboState::new();
        assert_eq!(combo.hold(1_000), 0);
        assert_eq!(combo.hold(3_000), 2_000);
        assert!(combo.bucket_changed(ComboBand::LogoutPending, 8));
        assert!(!combo.bucket_changed(ComboBand::LogoutPending, 8));
        assert!(combo.bucket_changed(ComboBand::LogoutPending, 7));

        assert_eq!(combo.release(13_000), Some(12_000));
        assert!(!combo.is_armed());
        assert_eq!(combo.release(14_000), None);
    }
}
