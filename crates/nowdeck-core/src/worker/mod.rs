//! Background loop: drains queued commands, then polls on its own cadence.


use log::{debug, warn};

use crate::{
    api::{CommandError, PlaybackClient, PlayerCommand, PollError, volume_with_delta},
    clock::Clock,
    commands::{CommandQueue, PlayIntent},
    config::WorkerTimings,
    credentials::CredentialStore,
    http::{Connectivity, HttpTransport},
    snapshot::PlaybackSnapshot,
};

/// Restart the current track or go back one, depending on how far the
/// current track has progressed.
pub fn previous_command(
    snapshot: &PlaybackSnapshot,
    since_poll_ms: u64,
    threshold_ms: u64,
) -> PlayerCommand {
    if snapshot.estimated_progress_ms(since_poll_ms) > threshold_ms {
        PlayerCommand::Seek(0)
    } else {
        PlayerCommand::Previous
    }
}

/// What one cycle did, mainly for tests and debug logging.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CycleReport {
    pub commands_sent: u8,
    pub polled: bool,
}

pub struct PlaybackWorker<'a, H, N, S, C> {
    client: PlaybackClient<'a, H, N, S, C>,
    commands: &'a CommandQueue,
    timings: WorkerTimings,
    last_poll_ms: Option<u64>,
    /// When the last poll landed in the shared state; `None` until then.
    last_snapshot_ms: Option<u64>,
}

impl<'a, H, N, S, C> PlaybackWorker<'a, H, N, S, C>
where
    H: HttpTransport,
    N: Connectivity,
    S: CredentialStore,
    C: Clock,
{
    pub fn new(client: PlaybackClient<'a, H, N, S, C>, commands: &'a CommandQueue) -> Self {
        let timings = client.config().worker;
        Self {
            client,
            commands,
            timings,
            last_poll_ms: None,
            last_snapshot_ms: None,
        }
    }

    pub fn client(&self) -> &PlaybackClient<'a, H, N, S, C> {
        &self.client
    }

    pub async fn run(mut self) -> ! {
        loop {
            self.run_cycle().await;
            self.client.clock().sleep_ms(self.timings.cycle_ms).await;
        }
    }

    /// Queued commands first, in fixed order, then the poll. Any command
    /// forces the poll regardless of the interval.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        if self.commands.take_next() {
            let _ = self
                .dispatch(&PlayerCommand::Next, self.timings.command_settle_ms, &mut report)
                .await;
        }

        if self.commands.take_previous() {
            let command = match self.read_snapshot().await {
                Some(snapshot) => previous_command(
                    &snapshot,
                    self.since_snapshot_ms(),
                    self.timings.smart_previous_threshold_ms,
                ),
                None => PlayerCommand::Previous,
            };
            let _ = self
                .dispatch(&command, self.timings.command_settle_ms, &mut report)
                .await;
        }

        if let Some(intent) = self.commands.take_play() {
            let command = match intent {
                PlayIntent::Play => PlayerCommand::Play,
                PlayIntent::Pause => PlayerCommand::Pause,
            };
            let result = self
                .dispatch(&command, self.timings.command_settle_ms, &mut report)
                .await;
            if result == Err(CommandError::Offline) {
                self.undo_play_intent(intent).await;
            }
        }

        if let Some(delta) = self.commands.take_volume_delta() {
            self.step_volume(delta, &mut report).await;
        }

        if self.commands.take_like() {
            self.save_current(&mut report).await;
        }

        let refresh = self.commands.take_refresh();
        let now = self.client.clock().now_ms();
        let due = match self.last_poll_ms {
            Some(last) => now.saturating_sub(last) >= self.timings.poll_interval_ms,
            None => true,
        };
        if report.commands_sent > 0 || refresh || due {
            self.poll(now).await;
            report.polled = true;
        }

        report
    }

    async fn dispatch(
        &mut self,
        command: &PlayerCommand,
        settle_ms: u64,
        report: &mut CycleReport,
    ) -> Result<u16, CommandError> {
        let result = self.client.execute(command).await;
        match result {
            Err(CommandError::Offline) => {
                debug!("worker: {} dropped while offline", command.label());
            }
            other => {
                report.commands_sent = report.commands_sent.saturating_add(1);
                if let Err(err) = other {
                    warn!("worker: {} failed err={:?}", command.label(), err);
                }
                if settle_ms > 0 {
                    self.client.clock().sleep_ms(settle_ms).await;
                }
            }
        }
        result
    }

    /// The link dropped after the interactive loop showed `intent`; put
    /// the last known player state back.
    async fn undo_play_intent(&mut self, intent: PlayIntent) {
        let shown = intent.is_playing();
        match self.read_snapshot().await {
            Some(snapshot) if snapshot.playing == shown => {}
            _ => return,
        }
        let shared = self.client.shared();
        let restored = shared
            .write(self.client.clock(), self.timings.lock_timeout_ms, |s| {
                s.playing = !shown
            })
            .await;
        if restored.is_err() {
            debug!("worker: play state restore skipped; state busy");
        }
    }

    async fn step_volume(&mut self, delta: i8, report: &mut CycleReport) {
        let Some(snapshot) = self.read_snapshot().await else {
            return;
        };
        let target = volume_with_delta(snapshot.volume_percent, delta);
        let command = PlayerCommand::SetVolume(target);
        if self.dispatch(&command, 0, report).await.is_ok() {
            let shared = self.client.shared();
            let written = shared
                .write(self.client.clock(), self.timings.lock_timeout_ms, |s| {
                    s.volume_percent = target
                })
                .await;
            if written.is_err() {
                debug!("worker: optimistic volume skipped; state busy");
            }
        }
    }

    async fn save_current(&mut self, report: &mut CycleReport) {
        let Some(snapshot) = self.read_snapshot().await else {
            return;
        };
        if !snapshot.has_saveable_track() {
            debug!("worker: like ignored; no current track");
            return;
        }
        let command = PlayerCommand::SaveTrack(snapshot.track_id.clone());
        let _ = self
            .dispatch(&command, self.timings.like_settle_ms, report)
            .await;
    }

    async fn poll(&mut self, now: u64) {
        self.last_poll_ms = Some(now);
        match self.client.poll().await {
            Ok(Some(_)) => self.last_snapshot_ms = Some(self.client.clock().now_ms()),
            Ok(None) => {}
            Err(PollError::Offline) => debug!("worker: poll skipped while offline"),
            Err(err) => warn!("worker: poll failed err={:?}", err),
        }
    }

    async fn read_snapshot(&self) -> Option<PlaybackSnapshot> {
        let shared = self.client.shared();
        match shared
            .read(self.client.clock(), self.timings.lock_timeout_ms)
            .await
        {
            Ok(snapshot) => Some(snapshot),
            Err(_) => {
                warn!("worker: shared state busy");
                None
            }
        }
    }

    /// Zero before any poll has landed, so nothing is extrapolated.
    fn since_snapshot_ms(&self) -> u64 {
        self.last_snapshot_ms.map_or(0, |at| {
            self.client.clock().now_ms().saturating_sub(at)
        })
    }
}
