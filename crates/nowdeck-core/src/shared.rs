//! Playback snapshot shared between the worker and the interactive loop.
//!
//! The interactive loop only ever uses the `try_*` entry points, which skip
//! on contention; the worker uses the bounded async variants.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_futures::select::{Either, select};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};

use crate::{clock::Clock, snapshot::PlaybackSnapshot};

/// The bounded lock wait elapsed before the lock was free.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LockTimeout;

pub struct SharedPlayback {
    state: Mutex<CriticalSectionRawMutex, PlaybackSnapshot>,
    dirty: AtomicBool,
}

impl SharedPlayback {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(PlaybackSnapshot::empty()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Copy-out with a bounded wait.
    pub async fn read<C: Clock>(
        &self,
        clock: &C,
        timeout_ms: u64,
    ) -> Result<PlaybackSnapshot, LockTimeout> {
        match select(self.state.lock(), clock.sleep_ms(timeout_ms)).await {
            Either::First(guard) => Ok(guard.clone()),
            Either::Second(()) => Err(LockTimeout),
        }
    }

    /// Mutates the snapshot with a bounded wait and marks it dirty.
    pub async fn write<C, F, R>(&self, clock: &C, timeout_ms: u64, f: F) -> Result<R, LockTimeout>
    where
        C: Clock,
        F: FnOnce(&mut PlaybackSnapshot) -> R,
    {
        match select(self.state.lock(), clock.sleep_ms(timeout_ms)).await {
            Either::First(mut guard) => {
                let result = f(&mut *guard);
                self.dirty.store(true, Ordering::Release);
                Ok(result)
            }
            Either::Second(()) => Err(LockTimeout),
        }
    }

    /// Zero-timeout copy-out.
    pub fn try_read(&self) -> Option<PlaybackSnapshot> {
        self.state.try_lock().ok().map(|guard| guard.clone())
    }

    /// Zero-timeout mutation; returns `false` on contention.
    pub fn try_write<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut PlaybackSnapshot),
    {
        let Ok(mut guard) = self.state.try_lock() else {
            return false;
        };
        f(&mut *guard);
        self.dirty.store(true, Ordering::Release);
        true
    }

    /// Atomic check-and-clear of the dirty flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Zero-timeout copy-out of a pending change.
    ///
    /// The dirty flag is only consumed when the lock was obtained, so a
    /// skipped tick leaves the render owed for the next one.
    pub fn try_take_update(&self) -> Option<PlaybackSnapshot> {
        if !self.is_dirty() {
            return None;
        }
        let guard = self.state.try_lock().ok()?;
        if !self.take_dirty() {
            return None;
        }
        Some(guard.clone())
    }
}

#[cfg(test)]
impl SharedPlayback {
    /// Holds the lock so tests can exercise the contended paths.
    pub(crate) fn hold(
        &self,
    ) -> embassy_sync::mutex::MutexGuard<'_, CriticalSectionRawMutex, PlaybackSnapshot> {
        self.state.try_lock().unwrap()
    }
}

impl Default for SharedPlayback {
    fn default() -> Self {
        Self::new()
    }
}
