use log::info;
use nowdeck_core::clock::Clock;

/// Delay so the confirmation popup and log lines settle before reset.
const RESTART_DELAY_MS: u64 = 2_000;

pub(super) async fn restart<C: Clock>(clock: &C, reason: &str) -> ! {
    info!("power: restarting in {}ms reason={}", RESTART_DELAY_MS, reason);
    clock.sleep_ms(RESTART_DELAY_MS).await;
    esp_hal::system::software_reset()
}
