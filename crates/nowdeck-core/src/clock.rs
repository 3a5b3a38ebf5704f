//! Time source for the worker loop and bounded waits.

/// Monotonic milliseconds plus a cooperative sleep.
pub trait Clock {
    fn now_ms(&self) -> u64;

    async fn sleep_ms(&self, ms: u64);
}

impl<C: Clock> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    async fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms).await
    }
}
