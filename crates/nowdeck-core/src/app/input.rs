impl<'a, B, R, S, N> DeckApp<'a, B, R, S, N>
where
    B: ButtonPanel,
    R: RenderAdapter,
    S: CredentialStore,
    N: Connectivity,
{
    fn sample_edges(&mut self, levels: ButtonLevels, now_ms: u64) -> TickEdges {
        let debounce_ms = self.timings.debounce_ms;
        TickEdges {
            previous: self.previous.update(levels.previous, now_ms, debounce_ms),
            play: self.play.update(levels.play, now_ms, debounce_ms),
            next: self.next.update(levels.next, now_ms, debounce_ms),
        }
    }

    /// A press that wakes the display must not also skip or pause.
    fn swallow_waking_taps(&mut self, edges: &TickEdges) {
        for (id, edge) in [
            (ButtonId::Previous, edges.previous),
            (ButtonId::Play, edges.play),
            (ButtonId::Next, edges.next),
        ] {
            if matches!(edge, Some(ButtonEdge::Pressed)) {
                self.tracker_mut(id).swallow_tap();
            }
        }
    }

    /// Prev+next hold. `Some` means the combo consumed this tick.
    fn handle_combo(&mut self, now_ms: u64) -> Option<TickResult> {
        let thresholds = self.combo_thresholds();

        if self.previous.is_pressed() && self.next.is_pressed() {
            self.previous.suppress();
            self.next.suppress();
            self.touch(now_ms);

            let held_ms = self.combo.hold(now_ms);
            let band = thresholds.band(held_ms);
            match band {
                ComboBand::Arming => {}
                ComboBand::FactoryReset => return Some(self.factory_reset()),
                ComboBand::LogoutPending | ComboBand::ResetPending => {
                    let seconds_left = thresholds.seconds_left(held_ms);
                    if self.combo.bucket_changed(band, seconds_left) {
                        let (label, tone) = if band == ComboBand::LogoutPending {
                            ("LOGOUT", PopupTone::Warning)
                        } else {
                            ("RESET", PopupTone::Danger)
                        };
                        let mut text = String::<POPUP_BYTES>::new();
                        let _ = write!(text, "{}: {}", label, seconds_left);
                        report("combo", self.renderer.show_popup(&text, tone));
                    }
                }
            }
            return Some(TickResult::Idle);
        }

        let held_ms = self.combo.release(now_ms)?;
        match thresholds.release_action(held_ms) {
            ComboAction::Logout => Some(self.logout()),
            ComboAction::FactoryReset => Some(self.factory_reset()),
            ComboAction::None => {
                debug!("app: combo cancelled held_ms={}", held_ms);
                self.pending_redraw = true;
                None
            }
        }
    }

    fn factory_reset(&mut self) -> TickResult {
        warn!("app: factory reset");
        report("popup", self.renderer.show_popup(FACTORY_RESET_TEXT, PopupTone::Danger));
        if let Err(err) = self.store.erase() {
            warn!("app: credential erase failed err={:?}", err);
        }
        self.request_restart(RestartReason::FactoryReset)
    }

    fn logout(&mut self) -> TickResult {
        info!("app: logout");
        report("popup", self.renderer.show_popup(LOGGING_OUT_TEXT, PopupTone::Warning));
        if let Err(err) = self.store.set_logged_in(false) {
            warn!("app: logout not persisted err={:?}", err);
        }
        self.request_restart(RestartReason::Logout)
    }

    fn request_restart(&mut self, reason: RestartReason) -> TickResult {
        self.restart = Some(reason);
        TickResult::RestartRequested(reason)
    }

    /// Play held alone saves the current track, once per hold.
    fn handle_like(&mut self, now_ms: u64) {
        if self.previous.is_pressed() || self.next.is_pressed() {
            return;
        }
        let Some(held_ms) = self.play.held_ms(now_ms) else {
            return;
        };
        if held_ms < self.timings.like_hold_ms || !self.play.fire_hold() {
            return;
        }

        info!("app: like requested");
        self.commands.request_like();
        report("popup", self.renderer.show_popup(SAVED_TEXT, PopupTone::Accent));
        self.overlay_until_ms = Some(now_ms.saturating_add(self.timings.overlay_ms));
        self.touch(now_ms);
    }

    fn handle_volume_repeat(&mut self, now_ms: u64) {
        if self.play.is_pressed() {
            return;
        }
        let delay_ms = self.timings.volume_repeat_delay_ms;
        let interval_ms = self.timings.volume_repeat_interval_ms;
        let step = self.timings.volume_step;

        if self.next.repeat_due(now_ms, delay_ms, interval_ms) {
            self.commands.request_volume_step(step);
            self.touch(now_ms);
        }
        if self.previous.repeat_due(now_ms, delay_ms, interval_ms) {
            self.commands.request_volume_step(step.saturating_neg());
            self.touch(now_ms);
        }
    }

    fn handle_taps(&mut self, edges: &TickEdges) {
        let tap_limit_ms = self.timings.volume_repeat_delay_ms;
        let is_tap = |edge: Option<ButtonEdge>, limit_ms: u64| {
            matches!(edge, Some(ButtonEdge::Released { held_ms, tap: true }) if held_ms < limit_ms)
        };

        if is_tap(edges.previous, tap_limit_ms) {
            debug!("app: previous tapped");
            self.commands.request_previous();
        }
        if is_tap(edges.next, tap_limit_ms) {
            debug!("app: next tapped");
            self.commands.request_next();
        }
        if is_tap(edges.play, u64::MAX) {
            self.toggle_play();
        }
    }

    /// Queues the opposite of what is on screen and shows it right away.
    ///
    /// Offline the command is still queued for the worker to drop, but the
    /// shared state and the screen keep the real player state.
    fn toggle_play(&mut self) {
        let intent = PlayIntent::toggled_from(self.displayed.playing);
        debug!("app: play tapped intent={:?}", intent);
        self.commands.request_play(intent);

        if !self.net.is_online() {
            debug!("app: offline; play state left as is");
            return;
        }
        let playing = intent.is_playing();
        if !self.shared.try_write(|snapshot| snapshot.playing = playing) {
            debug!("app: optimistic play state skipped; state busy");
        }
        self.displayed.playing = playing;
    }
}
