//! Last known playback state as shown on screen.

use heapless::String;

use crate::text::set_truncated;

pub const TEXT_BYTES: usize = 128;
pub const DEVICE_NAME_BYTES: usize = 64;
pub const TRACK_ID_BYTES: usize = 64;
pub const ARTWORK_URL_BYTES: usize = 256;

pub const NO_DEVICE_TITLE: &str = "No Active Device";
pub const NO_DEVICE_HINT: &str = "Tap Play to Wake";
pub const LOADING_TITLE: &str = "Loading...";

/// Point-in-time copy of the remote player.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlaybackSnapshot {
    pub track: String<TEXT_BYTES>,
    pub artist: String<TEXT_BYTES>,
    pub album: String<TEXT_BYTES>,
    pub device: String<DEVICE_NAME_BYTES>,
    pub track_id: String<TRACK_ID_BYTES>,
    pub artwork_url: Option<String<ARTWORK_URL_BYTES>>,
    pub playing: bool,
    pub progress_ms: u32,
    pub duration_ms: u32,
    /// 0..=100
    pub volume_percent: u8,
    pub logged_in: bool,
}

impl PlaybackSnapshot {
    pub const fn empty() -> Self {
        Self {
            track: String::new(),
            artist: String::new(),
            album: String::new(),
            device: String::new(),
            track_id: String::new(),
            artwork_url: None,
            playing: false,
            progress_ms: 0,
            duration_ms: 0,
            volume_percent: 0,
            logged_in: false,
        }
    }

    /// Boot placeholder shown until the first poll lands.
    pub fn loading(logged_in: bool) -> Self {
        let mut snapshot = Self::empty();
        let _ = set_truncated(&mut snapshot.track, LOADING_TITLE);
        snapshot.logged_in = logged_in;
        snapshot
    }

    /// Marks the remote side as having no active playback device.
    ///
    /// Only title, artist and the playing flag change; the rest keeps the
    /// last known values.
    pub fn mark_no_active_device(&mut self) {
        let _ = set_truncated(&mut self.track, NO_DEVICE_TITLE);
        let _ = set_truncated(&mut self.artist, NO_DEVICE_HINT);
        self.playing = false;
    }

    /// Sets progress while keeping `progress <= duration` for known durations.
    pub fn set_progress(&mut self, progress_ms: u32, duration_ms: u32) {
        self.duration_ms = duration_ms;
        self.progress_ms = if duration_ms > 0 {
            progress_ms.min(duration_ms)
        } else {
            progress_ms
        };
    }

    /// Progress extrapolated by wall-clock time when playing.
    pub fn estimated_progress_ms(&self, since_poll_ms: u64) -> u64 {
        let base = self.progress_ms as u64;
        if self.playing {
            base.saturating_add(since_poll_ms)
        } else {
            base
        }
    }

    pub fn has_saveable_track(&self) -> bool {
        self.track_id.len() >= 5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_device_keeps_other_fields() {
        let mut snapshot = PlaybackSnapshot::loading(true);
        let _ = set_truncated(&mut snapshot.device, "Kitchen");
        snapshot.volume_percent = 40;
        snapshot.playing = true;

        snapshot.mark_no_active_device();

        assert_eq!(snapshot.track.as_str(), NO_DEVICE_TITLE);
        assert_eq!(snapshot.artist.as_str(), NO_DEVICE_HINT);
        assert!(!snapshot.playing);
        assert_eq!(snapshot.device.as_str(), "Kitchen");
        assert_eq!(snapshot.volume_percent, 40);
        assert!(snapshot.logged_in);
    }

    #[test]
    fn progress_is_clamped_to_known_duration() {
        let mut snapshot = PlaybackSnapshot::empty();
        snapshot.set_progress(12_000, 10_000);
        assert_eq!(snapshot.progress_ms, 10_000);

        snapshot.set_progress(12_000, 0);
        assert_eq!(snapshot.progress_ms, 12_000);
    }

    #[test]
    fn estimate_only_advances_while_playing() {
        let mut snapshot = PlaybackSnapshot::empty();
        snapshot.progress_ms = 9_000;
        assert_eq!(snapshot.estimated_progress_ms(2_000), 9_000);

        snapshot.playing = true;
        assert_eq!(snapshot.estimated_progress_ms(2_000), 11_000);
    }
}
