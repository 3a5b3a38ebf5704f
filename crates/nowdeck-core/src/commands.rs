//! Trigger flags written by the interactive loop and drained by the worker.
//!
//! Each trigger is read-and-clear. Presses between two worker cycles
//! coalesce: boolean triggers simply stay set, while the play intent and the
//! volume delta are last-write-wins (a second volume step before the worker
//! runs replaces the first rather than adding to it).

use core::sync::atomic::{AtomicBool, AtomicI8, AtomicU8, Ordering};

const PLAY_NONE: u8 = 0;
const PLAY_RESUME: u8 = 1;
const PLAY_PAUSE: u8 = 2;

/// Desired play state recorded at tap time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayIntent {
    Play,
    Pause,
}

impl PlayIntent {
    pub const fn toggled_from(playing: bool) -> Self {
        if playing { Self::Pause } else { Self::Play }
    }

    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Play)
    }
}

#[derive(Debug)]
pub struct CommandQueue {
    next: AtomicBool,
    previous: AtomicBool,
    play: AtomicU8,
    volume_delta: AtomicI8,
    like: AtomicBool,
    refresh: AtomicBool,
}

impl CommandQueue {
    pub const fn new() -> Self {
        Self {
            next: AtomicBool::new(false),
            previous: AtomicBool::new(false),
            play: AtomicU8::new(PLAY_NONE),
            volume_delta: AtomicI8::new(0),
            like: AtomicBool::new(false),
            refresh: AtomicBool::new(false),
        }
    }

    pub fn request_next(&self) {
        self.next.store(true, Ordering::Release);
    }

    pub fn request_previous(&self) {
        self.previous.store(true, Ordering::Release);
    }

    pub fn request_play(&self, intent: PlayIntent) {
        let raw = match intent {
            PlayIntent::Play => PLAY_RESUME,
            PlayIntent::Pause => PLAY_PAUSE,
        };
        self.play.store(raw, Ordering::Release);
    }

    pub fn request_volume_step(&self, delta: i8) {
        self.volume_delta.store(delta, Ordering::Release);
    }

    pub fn request_like(&self) {
        self.like.store(true, Ordering::Release);
    }

    /// Asks for an out-of-cycle poll.
    pub fn request_refresh(&self) {
        self.refresh.store(true, Ordering::Release);
    }

    pub fn take_next(&self) -> bool {
        self.next.swap(false, Ordering::AcqRel)
    }

    pub fn take_previous(&self) -> bool {
        self.previous.swap(false, Ordering::AcqRel)
    }

    pub fn take_play(&self) -> Option<PlayIntent> {
        match self.play.swap(PLAY_NONE, Ordering::AcqRel) {
            PLAY_RESUME => Some(PlayIntent::Play),
            PLAY_PAUSE => Some(PlayIntent::Pause),
            _ => None,
        }
    }

    pub fn take_volume_delta(&self) -> Option<i8> {
        match self.volume_delta.swap(0, Ordering::AcqRel) {
            0 => None,
            delta => Some(delta),
        }
    }

    pub fn take_like(&self) -> bool {
        self.like.swap(false, Ordering::AcqRel)
    }

    pub fn take_refresh(&self) -> bool {
        self.refresh.swap(false, Ordering::AcqRel)
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_are_consumed_once() {
        let queue = CommandQueue::new();
        queue.request_next();
        queue.request_next();

        assert!(queue.take_next());
        assert!(!queue.take_next());
        assert!(!queue.take_previous());
    }

    #[test]
    fn volume_delta_is_last_write_wins() {
        let queue = CommandQueue::new();
        queue.request_volume_step(10);
        queue.request_volume_step(-10);

        assert_eq!(queue.take_volume_delta(), Some(-10));
        assert_eq!(queue.take_volume_delta(), None);
    }

    #[test]
    fn play_intent_keeps_latest_request() {
        let queue = CommandQueue::new();
        queue.request_play(PlayIntent::toggled_from(true));
        queue.request_play(PlayIntent::toggled_from(false));

        assert_eq!(queue.take_play(), Some(PlayIntent::Play));
        assert_eq!(queue.take_play(), None);
    }
}
