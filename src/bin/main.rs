#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_time::{Duration as EmbassyDuration, Timer, WithTimeout};
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    rng::Rng,
    spi::master::Spi,
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use log::{LevelFilter, info, warn};
use nowdeck_core::{
    api::PlaybackClient,
    app::{DeckApp, RestartReason, TickResult},
    clock::Clock,
    commands::CommandQueue,
    config::DeckConfig,
    credentials::{DEVICE_ID_ENTROPY_BYTES, SharedStore},
    http::Connectivity,
    link::LinkState,
    render::RenderAdapter,
    session::{AuthSettings, BootOutcome, establish_session},
    shared::SharedPlayback,
    worker::PlaybackWorker,
};
use nowdeck_hal_esp32s3::{
    input::buttons::{ButtonConfig, GpioButtons},
    network::http::{HttpsBuffers, HttpsTcpState, ReqwlessTransport},
    platform::{clock::EmbassyClock, display::SharpDisplay, panel::FrameBuffer},
    render::{now_playing::NowPlayingPainter, panel_renderer::PanelRenderer},
    storage::flash_credentials::FlashCredentialStore,
};
use static_cell::StaticCell;

#[path = "main/power.rs"]
mod power;

const DISPLAY_SPI_HZ: u32 = 1_000_000;
const WIFI_RETRY_BACKOFF_MIN_SECS: u64 = 2;
const WIFI_RETRY_BACKOFF_MAX_SECS: u64 = 120;
const NETWORK_POLL_INTERVAL_MS: u64 = 500;
const DHCP_TIMEOUT_SECS: u64 = 15;
const ONLINE_WAIT_POLL_MS: u64 = 250;
const UI_TICK_MS: u64 = 10;

const WIFI_SSID: &str = env!(
    "NOWDECK_WIFI_SSID",
    "Set NOWDECK_WIFI_SSID in your environment before building/flashing."
);
const WIFI_PASSWORD: &str = env!(
    "NOWDECK_WIFI_PASSWORD",
    "Set NOWDECK_WIFI_PASSWORD in your environment before building/flashing."
);
const AUTH_URL: &str = env!(
    "NOWDECK_AUTH_URL",
    "Set NOWDECK_AUTH_URL to the token service base URL before building/flashing."
);
const AUTH_KEY: &str = env!(
    "NOWDECK_AUTH_KEY",
    "Set NOWDECK_AUTH_KEY to the token service key before building/flashing."
);

static CONNECTIVITY: LinkState = LinkState::new();
static SHARED: SharedPlayback = SharedPlayback::new();
static COMMANDS: CommandQueue = CommandQueue::new();
static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();
static TCP_STATE: StaticCell<HttpsTcpState> = StaticCell::new();
static HTTPS_BUFFERS: StaticCell<HttpsBuffers> = StaticCell::new();
static FRAME: StaticCell<FrameBuffer> = StaticCell::new();
static STORE: StaticCell<SharedStore<FlashCredentialStore>> = StaticCell::new();

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn wifi_retry_backoff_secs(consecutive_failures: u32) -> u64 {
    // 2, 4, 8, 16, 32, 64, 120, 120, ...
    let shift = consecutive_failures.min(6);
    WIFI_RETRY_BACKOFF_MIN_SECS
        .saturating_mul(1u64 << shift)
        .min(WIFI_RETRY_BACKOFF_MAX_SECS)
}

async fn wait_before_wifi_retry(consecutive_failures: &mut u32) {
    let delay_secs = wifi_retry_backoff_secs(*consecutive_failures);
    *consecutive_failures = consecutive_failures.saturating_add(1);
    info!(
        "wifi: retrying in {}s consecutive_failures={}",
        delay_secs, *consecutive_failures
    );
    Timer::after_secs(delay_secs).await;
}

async fn wifi_connection_loop(
    wifi_controller: &mut WifiController<'_>,
    stack: Stack<'_>,
    connectivity: &'static LinkState,
) -> ! {
    let mut consecutive_failures = 0u32;

    loop {
        if !wifi_controller.is_started().unwrap_or(false) {
            if let Err(err) = wifi_controller.start_async().await {
                warn!("wifi: start failed err={:?}", err);
                connectivity.mark_disconnected();
                wait_before_wifi_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        if let Err(err) = wifi_controller.connect_async().await {
            warn!("wifi: connect failed err={:?}", err);
            connectivity.mark_disconnected();
            let _ = wifi_controller.disconnect_async().await;
            wait_before_wifi_retry(&mut consecutive_failures).await;
            continue;
        }

        match stack
            .wait_config_up()
            .with_timeout(EmbassyDuration::from_secs(DHCP_TIMEOUT_SECS))
            .await
        {
            Ok(()) => {
                connectivity.update(stack.is_link_up(), stack.config_v4().is_some());
                info!("wifi: connected and dhcp ready");
            }
            Err(_) => {
                warn!("wifi: dhcp timeout; forcing reconnect");
                connectivity.update(stack.is_link_up(), false);
                let _ = wifi_controller.disconnect_async().await;
                wait_before_wifi_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        consecutive_failures = 0;

        loop {
            let link_up = stack.is_link_up();
            let has_ipv4 = stack.config_v4().is_some();
            let is_connected = matches!(wifi_controller.is_connected(), Ok(true));

            connectivity.update(link_up, has_ipv4);

            if !(link_up && has_ipv4 && is_connected) {
                info!(
                    "wifi: state lost link_up={} has_ipv4={} connected={}; reconnecting",
                    link_up, has_ipv4, is_connected
                );
                break;
            }

            Timer::after_millis(NETWORK_POLL_INTERVAL_MS).await;
        }

        connectivity.mark_disconnected();
        let _ = wifi_controller.disconnect_async().await;
        wait_before_wifi_retry(&mut consecutive_failures).await;
    }
}

async fn wait_until_online(connectivity: &LinkState) {
    while !connectivity.is_online() {
        Timer::after_millis(ONLINE_WAIT_POLL_MS).await;
    }
}

fn random_seed(rng: &Rng) -> u64 {
    (rng.random() as u64) << 32 | rng.random() as u64
}

fn device_entropy(rng: &Rng) -> [u8; DEVICE_ID_ENTROPY_BYTES] {
    let mut entropy = [0u8; DEVICE_ID_ENTROPY_BYTES];
    for chunk in entropy.chunks_mut(4) {
        let word = rng.random().to_le_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
    entropy
}

async fn halt(reason: &str) -> ! {
    warn!("boot: {}; halting", reason);
    loop {
        Timer::after_secs(1).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: nowdeck starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio and the player-state parser both allocate.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);
    esp_alloc::heap_allocator!(size: 48 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let rng = Rng::new();
    let deck_config = DeckConfig::default();

    // Display: CLK=GPIO13, DI=GPIO14, CS=GPIO15, DISP=GPIO2, EMD=GPIO9
    let disp = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let emd = Output::new(peripherals.GPIO9, Level::Low, OutputConfig::default());
    let cs = Output::new(peripherals.GPIO15, Level::Low, OutputConfig::default());

    let spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(DISPLAY_SPI_HZ))
        // LS027B7DH01 uses CPOL=0, CPHA=1.
        .with_mode(esp_hal::spi::Mode::_1);
    let spi = match Spi::new(peripherals.SPI2, spi_config) {
        Ok(spi) => spi
            .with_sck(peripherals.GPIO13)
            .with_mosi(peripherals.GPIO14),
        Err(err) => {
            warn!("display: spi config rejected err={:?}", err);
            halt("display unavailable").await
        }
    };

    let mut display = SharpDisplay::new(spi, disp, emd, cs, Delay::new());
    if let Err(err) = display.initialize() {
        warn!("display: initialize failed err={:?}", err);
    }
    let mut renderer = PanelRenderer::new(
        display,
        FRAME.init_with(FrameBuffer::new),
        NowPlayingPainter,
    );
    if let Err(err) = renderer.clear_screen() {
        warn!("display: clear failed err={:?}", err);
    }
    if let Err(err) = renderer.show_splash() {
        warn!("display: splash failed err={:?}", err);
    }

    // Buttons: PREV=GPIO10, PLAY=GPIO11, NEXT=GPIO12, active low.
    let input_cfg = InputConfig::default().with_pull(Pull::Up);
    let buttons = GpioButtons::new(
        Input::new(peripherals.GPIO10, input_cfg),
        Input::new(peripherals.GPIO11, input_cfg),
        Input::new(peripherals.GPIO12, input_cfg),
        ButtonConfig::default(),
    );

    let store = match FlashCredentialStore::new() {
        Ok(flash) => STORE.init(SharedStore::new(flash)),
        Err(err) => {
            warn!("credentials: flash store unavailable err={:?}", err);
            halt("no credential storage").await
        }
    };

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            warn!("wifi: esp-radio init failed err={:?}", err);
            halt("radio unavailable").await
        }
    };

    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                warn!("wifi: peripheral init failed err={:?}", err);
                halt("wifi unavailable").await
            }
        };

    let client_config = ClientConfig::default()
        .with_ssid(WIFI_SSID.into())
        .with_password(WIFI_PASSWORD.into());
    if let Err(err) = wifi_controller.set_config(&ModeConfig::Client(client_config)) {
        warn!("wifi: mode config failed err={:?}", err);
        halt("wifi misconfigured").await
    }

    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        random_seed(&rng),
    );

    let http = ReqwlessTransport::new(
        stack,
        TCP_STATE.init(HttpsTcpState::new()),
        HTTPS_BUFFERS.init_with(HttpsBuffers::new),
        random_seed(&rng),
    );

    info!("boot: display CLK=GPIO13 DI=GPIO14 CS=GPIO15 DISP=GPIO2 EMD=GPIO9");
    info!("boot: buttons PREV=GPIO10 PLAY=GPIO11 NEXT=GPIO12");

    let net_future = async { net_runner.run().await };
    let wifi_future = wifi_connection_loop(&mut wifi_controller, stack, &CONNECTIVITY);

    let deck_future = async move {
        let mut http = http;
        let mut renderer = renderer;
        let clock = EmbassyClock;

        wait_until_online(&CONNECTIVITY).await;
        info!("boot: network online");

        let auth = AuthSettings {
            base_url: AUTH_URL,
            secret: AUTH_KEY,
        };
        let session = match establish_session(
            &mut http,
            store,
            &SHARED,
            &mut renderer,
            &clock,
            auth,
            &device_entropy(&rng),
            deck_config.worker.login_poll_ms,
        )
        .await
        {
            BootOutcome::Ready(session) => session,
            BootOutcome::RestartRequired => power::restart(&clock, "stored login rejected").await,
        };

        let client = PlaybackClient::new(
            http,
            &CONNECTIVITY,
            session.tokens,
            &SHARED,
            store,
            clock,
            deck_config,
        )
        .with_last_device(session.credentials.last_remote_device.as_deref());
        let worker = PlaybackWorker::new(client, &COMMANDS);

        let mut app = DeckApp::new(
            buttons,
            renderer,
            &CONNECTIVITY,
            &SHARED,
            &COMMANDS,
            store,
            deck_config.input,
        );
        info!(
            "deck: running poll_ms={} sleep_timeout_ms={}",
            deck_config.worker.poll_interval_ms, deck_config.input.sleep_timeout_ms
        );

        let ui_future = async {
            loop {
                if let TickResult::RestartRequested(reason) = app.tick(clock.now_ms()) {
                    break reason;
                }
                Timer::after_millis(UI_TICK_MS).await;
            }
        };

        match select(worker.run(), ui_future).await {
            Either::First(never) => never,
            Either::Second(RestartReason::Logout) => power::restart(&clock, "logout").await,
            Either::Second(RestartReason::FactoryReset) => {
                power::restart(&clock, "factory reset").await
            }
        }
    };

    let _ = embassy_futures::join::join3(net_future, wifi_future, deck_future).await;
    unreachable!()
}
