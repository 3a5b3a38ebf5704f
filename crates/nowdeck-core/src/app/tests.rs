use super::*;
use crate::{
    credentials::{MemoryCredentialStore, StoredCredentials},
    input::mock::MockButtons,
    testing::{FlagNet, RecordingRenderer, RenderEvent},
};

struct Harness {
    net: FlagNet,
    shared: SharedPlayback,
    commands: CommandQueue,
    store: SharedStore<MemoryCredentialStore>,
}

type TestApp<'a> = DeckApp<'a, MockButtons, RecordingRenderer, MemoryCredentialStore, &'a FlagNet>;

impl Harness {
    fn new() -> Self {
        let mut creds = StoredCredentials::generated(&[5; 16]);
        creds.logged_in = true;
        Self {
            net: FlagNet::online(),
            shared: SharedPlayback::new(),
            commands: CommandQueue::new(),
            store: SharedStore::new(MemoryCredentialStore::with_record(creds)),
        }
    }

    fn app(&self) -> TestApp<'_> {
        let timings = InputTimings::default().with_debounce_ms(0);
        let mut app = DeckApp::new(
            MockButtons::new(),
            RecordingRenderer::default(),
            &self.net,
            &self.shared,
            &self.commands,
            &self.store,
            timings,
        );
        app.tick(0);
        app.renderer_mut().take();
        app
    }

    fn logged_in(&self) -> Option<bool> {
        self.store.with(|s| s.record().map(|r| r.logged_in))
    }
}

fn press(app: &mut TestApp<'_>, ids: &[ButtonId], now_ms: u64) -> TickResult {
    for id in ids {
        app.buttons_mut().press(*id);
    }
    app.tick(now_ms)
}

fn release(app: &mut TestApp<'_>, ids: &[ButtonId], now_ms: u64) -> TickResult {
    for id in ids {
        app.buttons_mut().release(*id);
    }
    app.tick(now_ms)
}

/// Ticks every `step_ms` in `(from, to]`, collecting every queued volume step.
fn run_collecting_volume(
    app: &mut TestApp<'_>,
    harness: &Harness,
    from: u64,
    to: u64,
    step_ms: u64,
) -> std::vec::Vec<(u64, i8)> {
    let mut steps = std::vec::Vec::new();
    let mut now = from;
    while now < to {
        now += step_ms;
        app.tick(now);
        if let Some(delta) = harness.commands.take_volume_delta() {
            steps.push((now, delta));
        }
    }
    steps
}

#[test]
fn first_tick_clears_and_draws_current_state() {
    let h = Harness::new();
    h.shared.try_write(|s| *s = PlaybackSnapshot::loading(true));
    let mut app = DeckApp::new(
        MockButtons::new(),
        RecordingRenderer::default(),
        &h.net,
        &h.shared,
        &h.commands,
        &h.store,
        InputTimings::default(),
    );

    assert_eq!(app.tick(0), TickResult::Rendered);
    let events = app.renderer_mut().take();
    assert_eq!(events[0], RenderEvent::Clear);
    assert!(matches!(&events[1], RenderEvent::Snapshot(s) if s.track.as_str() == "Loading..."));
    assert_eq!(app.tick(10), TickResult::Idle);
}

#[test]
fn dirty_flag_drives_redraws() {
    let h = Harness::new();
    let mut app = h.app();

    assert_eq!(app.tick(10), TickResult::Idle);
    h.shared.try_write(|s| s.volume_percent = 70);
    assert_eq!(app.tick(20), TickResult::Rendered);
    assert_eq!(app.displayed().volume_percent, 70);
    assert_eq!(app.tick(30), TickResult::Idle);
}

#[test]
fn contended_state_skips_render_without_blocking() {
    let h = Harness::new();
    let mut app = h.app();
    h.shared.try_write(|s| s.playing = false);

    let guard = h.shared.hold();
    assert_eq!(app.tick(10), TickResult::Idle);
    drop(guard);

    assert_eq!(app.tick(20), TickResult::Rendered);
}

#[test]
fn short_presses_queue_skip_commands() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Next], 100);
    assert!(!h.commands.take_next());
    release(&mut app, &[ButtonId::Next], 250);
    assert!(h.commands.take_next());

    press(&mut app, &[ButtonId::Previous], 400);
    release(&mut app, &[ButtonId::Previous], 700);
    assert!(h.commands.take_previous());
    assert_eq!(h.commands.take_volume_delta(), None);
}

#[test]
fn held_next_repeats_volume_instead_of_skipping() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Next], 0);
    let steps = run_collecting_volume(&mut app, &h, 0, 2_000, 100);
    release(&mut app, &[ButtonId::Next], 2_050);

    assert_eq!(steps, [(800, 10), (1_300, 10), (1_800, 10)]);
    assert!(!h.commands.take_next());
}

#[test]
fn held_previous_steps_volume_down() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Previous], 0);
    let steps = run_collecting_volume(&mut app, &h, 0, 900, 100);
    release(&mut app, &[ButtonId::Previous], 950);

    assert_eq!(steps, [(800, -10)]);
    assert!(!h.commands.take_previous());
}

#[test]
fn play_tap_queues_opposite_state_and_shows_it() {
    let h = Harness::new();
    h.shared.try_write(|s| s.playing = true);
    let mut app = h.app();
    assert!(app.displayed().playing);

    press(&mut app, &[ButtonId::Play], 100);
    release(&mut app, &[ButtonId::Play], 180);

    assert_eq!(h.commands.take_play(), Some(PlayIntent::Pause));
    assert!(!app.displayed().playing);
    assert_eq!(h.shared.try_read().map(|s| s.playing), Some(false));
}

#[test]
fn offline_play_tap_queues_but_keeps_real_state() {
    let h = Harness::new();
    h.net.set_online(false);
    h.shared.try_write(|s| s.playing = true);
    let mut app = h.app();

    press(&mut app, &[ButtonId::Play], 10);
    release(&mut app, &[ButtonId::Play], 60);

    assert_eq!(h.commands.take_play(), Some(PlayIntent::Pause));
    assert!(app.displayed().playing);
    assert_eq!(h.shared.try_read().map(|s| s.playing), Some(true));
    assert!(!h.shared.is_dirty());
}

#[test]
fn play_hold_likes_once_and_shows_overlay() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Play], 0);
    app.tick(2_999);
    assert!(!h.commands.take_like());

    app.tick(3_000);
    assert!(h.commands.take_like());
    assert_eq!(app.renderer().popups(), [SAVED_TEXT]);
    assert_eq!(
        app.renderer().events.last(),
        Some(&RenderEvent::Popup(SAVED_TEXT.into(), PopupTone::Accent))
    );

    app.tick(4_000);
    release(&mut app, &[ButtonId::Play], 4_500);
    assert!(!h.commands.take_like());
    assert_eq!(h.commands.take_play(), None);

    h.shared.try_write(|s| s.volume_percent = 20);
    app.renderer_mut().take();
    assert_eq!(app.tick(5_999), TickResult::Idle);
    assert_eq!(app.tick(6_000), TickResult::Rendered);
    let events = app.renderer_mut().take();
    assert_eq!(events[0], RenderEvent::Clear);
    assert!(matches!(&events[1], RenderEvent::Snapshot(s) if s.volume_percent == 20));
}

#[test]
fn combo_released_in_reset_band_logs_out() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Previous, ButtonId::Next], 0);
    let mut now = 0;
    while now < 11_500 {
        now += 500;
        assert_eq!(app.tick(now), TickResult::Idle);
    }
    let result = release(&mut app, &[ButtonId::Previous, ButtonId::Next], 12_000);

    assert_eq!(result, TickResult::RestartRequested(RestartReason::Logout));
    assert_eq!(h.logged_in(), Some(false));
    let popups = app.renderer().popups();
    assert_eq!(popups.first(), Some(&"LOGOUT: 8"));
    assert!(popups.contains(&"LOGOUT: 0"));
    assert!(popups.contains(&"RESET: 10"));
    assert!(popups.contains(&"RESET: 8"));
    assert_eq!(popups.last(), Some(&LOGGING_OUT_TEXT));
    assert!(!h.commands.take_next());
    assert!(!h.commands.take_previous());
    assert_eq!(h.commands.take_volume_delta(), None);
    assert_eq!(app.tick(12_100), TickResult::Idle);
}

#[test]
fn countdown_redraws_only_when_second_changes() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Previous, ButtonId::Next], 0);
    for now in (100..=3_000).step_by(100) {
        app.tick(now);
    }

    assert_eq!(app.renderer().popups(), ["LOGOUT: 8", "LOGOUT: 7"]);
}

#[test]
fn combo_held_to_twenty_seconds_factory_resets_while_held() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Previous, ButtonId::Next], 0);
    let mut now = 0;
    let mut result = TickResult::Idle;
    while now < 20_000 {
        now += 1_000;
        result = app.tick(now);
    }

    assert_eq!(result, TickResult::RestartRequested(RestartReason::FactoryReset));
    assert_eq!(app.renderer().popups().last(), Some(&FACTORY_RESET_TEXT));
    assert_eq!(h.logged_in(), None);

    let after = release(&mut app, &[ButtonId::Previous, ButtonId::Next], 25_000);
    assert_eq!(after, TickResult::Idle);
    assert_eq!(app.restart_reason(), Some(RestartReason::FactoryReset));
}

#[test]
fn early_combo_release_cancels_and_redraws() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Previous, ButtonId::Next], 0);
    for now in (500..=5_000).step_by(500) {
        app.tick(now);
    }
    app.renderer_mut().take();
    let result = release(&mut app, &[ButtonId::Previous, ButtonId::Next], 5_200);

    assert_eq!(result, TickResult::Rendered);
    let events = app.renderer_mut().take();
    assert_eq!(events[0], RenderEvent::Clear);
    assert!(matches!(events[1], RenderEvent::Snapshot(_)));
    assert_eq!(h.logged_in(), Some(true));
    assert!(!h.commands.take_next());
    assert!(!h.commands.take_previous());
}

#[test]
fn sleeps_exactly_at_timeout() {
    let h = Harness::new();
    let mut app = h.app();

    app.tick(299_999);
    assert!(!app.is_sleeping());
    app.tick(300_000);
    assert!(app.is_sleeping());
    assert_eq!(
        app.renderer_mut().take(),
        [RenderEvent::Backlight(false), RenderEvent::Clear]
    );
}

#[test]
fn interaction_restarts_idle_timer() {
    let h = Harness::new();
    let mut app = h.app();

    press(&mut app, &[ButtonId::Next], 200_000);
    release(&mut app, &[ButtonId::Next], 200_100);
    assert!(h.commands.take_next());

    app.tick(300_000);
    assert!(!app.is_sleeping());
    app.tick(499_999);
    assert!(!app.is_sleeping());
    app.tick(500_000);
    assert!(app.is_sleeping());
}

#[test]
fn playing_state_keeps_display_awake() {
    let h = Harness::new();
    h.shared.try_write(|s| s.playing = true);
    let mut app = h.app();

    app.tick(400_000);
    assert!(!app.is_sleeping());
}

#[test]
fn waking_press_is_swallowed_and_requests_refresh() {
    let h = Harness::new();
    let mut app = h.app();
    app.tick(300_000);
    assert!(app.is_sleeping());
    app.renderer_mut().take();

    press(&mut app, &[ButtonId::Next], 310_000);
    release(&mut app, &[ButtonId::Next], 310_100);

    assert!(!app.is_sleeping());
    assert!(!h.commands.take_next());
    assert!(h.commands.take_refresh());
    let events = app.renderer_mut().take();
    assert_eq!(events[0], RenderEvent::Backlight(true));
    assert_eq!(events[1], RenderEvent::Clear);
    assert!(matches!(events[2], RenderEvent::Snapshot(_)));
}

#[test]
fn sleeping_absorbs_updates_without_drawing() {
    let h = Harness::new();
    let mut app = h.app();
    app.tick(300_000);
    app.renderer_mut().take();

    h.shared.try_write(|s| s.volume_percent = 55);
    assert_eq!(app.tick(300_100), TickResult::Idle);

    assert!(app.renderer().events.is_empty());
    assert_eq!(app.displayed().volume_percent, 55);
    assert!(!h.shared.is_dirty());
}
