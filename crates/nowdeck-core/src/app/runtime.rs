impl<'a, B, R, S, N> DeckApp<'a, B, R, S, N>
where
    B: ButtonPanel,
    R: RenderAdapter,
    S: CredentialStore,
    N: Connectivity,
{
    /// One pass of the interactive loop. Never waits on the shared lock.
    pub fn tick(&mut self, now_ms: u64) -> TickResult {
        if self.restart.is_some() {
            return TickResult::Idle;
        }
        self.last_activity_ms.get_or_insert(now_ms);

        let Ok(levels) = self.buttons.sample() else {
            debug!("app: button sample failed");
            return TickResult::Idle;
        };
        let edges = self.sample_edges(levels, now_ms);

        if edges.any_pressed() {
            self.touch(now_ms);
            if self.sleeping {
                self.wake();
                self.swallow_waking_taps(&edges);
            }
        }

        if let Some(result) = self.handle_combo(now_ms) {
            return result;
        }
        self.handle_like(now_ms);
        self.expire_overlay(now_ms);
        self.handle_volume_repeat(now_ms);
        self.handle_taps(&edges);
        self.update_sleep(now_ms);

        self.render()
    }

    fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = Some(now_ms);
    }

    fn expire_overlay(&mut self, now_ms: u64) {
        if self.overlay_until_ms.is_some_and(|until| now_ms >= until) {
            self.overlay_until_ms = None;
            self.pending_redraw = true;
        }
    }

    fn update_sleep(&mut self, now_ms: u64) {
        if self.displayed.playing {
            self.touch(now_ms);
        }
        if self.sleeping {
            return;
        }
        let idle_ms = now_ms.saturating_sub(self.last_activity_ms.unwrap_or(now_ms));
        if idle_ms < self.timings.sleep_timeout_ms {
            return;
        }

        info!("app: sleeping idle_ms={}", idle_ms);
        self.sleeping = true;
        self.overlay_until_ms = None;
        report("backlight", self.renderer.set_backlight(false));
        report("clear", self.renderer.clear_screen());
    }

    fn wake(&mut self) {
        info!("app: waking");
        self.sleeping = false;
        self.pending_redraw = true;
        report("backlight", self.renderer.set_backlight(true));
        self.commands.request_refresh();
    }

    fn render(&mut self) -> TickResult {
        if self.sleeping {
            if let Some(snapshot) = self.shared.try_take_update() {
                self.displayed = snapshot;
            }
            return TickResult::Idle;
        }
        if self.overlay_until_ms.is_some() {
            return TickResult::Idle;
        }

        if self.pending_redraw {
            let was_dirty = self.shared.take_dirty();
            let Some(snapshot) = self.shared.try_read() else {
                if was_dirty {
                    self.shared.mark_dirty();
                }
                return TickResult::Idle;
            };
            self.pending_redraw = false;
            report("clear", self.renderer.clear_screen());
            return self.draw(snapshot);
        }

        match self.shared.try_take_update() {
            Some(snapshot) => self.draw(snapshot),
            None => TickResult::Idle,
        }
    }

    fn draw(&mut self, snapshot: PlaybackSnapshot) -> TickResult {
        report("snapshot", self.renderer.render_snapshot(&snapshot));
        self.displayed = snapshot;
        TickResult::Rendered
    }
}
