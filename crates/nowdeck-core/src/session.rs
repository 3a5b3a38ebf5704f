//! Boot-time identity and token acquisition.

use core::fmt::Write;

use heapless::String;
use log::{info, warn};

use crate::{
    auth::TokenManager,
    clock::Clock,
    credentials::{CredentialStore, DEVICE_ID_ENTROPY_BYTES, SharedStore, StoredCredentials},
    http::HttpTransport,
    render::{RenderAdapter, report},
    shared::SharedPlayback,
    snapshot::PlaybackSnapshot,
};

pub const LOGIN_TITLE: &str = "Scan to Login:";
pub const LOGIN_WAITING: &str = "Waiting for token...";

/// Auth service coordinates baked into the firmware.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AuthSettings<'a> {
    pub base_url: &'a str,
    pub secret: &'a str,
}

#[derive(Debug)]
pub struct Session {
    pub tokens: TokenManager,
    pub credentials: StoredCredentials,
}

#[derive(Debug)]
pub enum BootOutcome {
    Ready(Session),
    /// The stored login no longer refreshes; the device must reboot into
    /// the login flow.
    RestartRequired,
}

/// Loads or creates the device identity and obtains a first token.
///
/// A device that was logged in refreshes once and gives up on failure. A
/// device that never logged in shows the login QR and waits for the user.
#[allow(clippy::too_many_arguments)]
pub async fn establish_session<H, S, R, C>(
    http: &mut H,
    store: &SharedStore<S>,
    shared: &SharedPlayback,
    renderer: &mut R,
    clock: &C,
    auth: AuthSettings<'_>,
    entropy: &[u8; DEVICE_ID_ENTROPY_BYTES],
    login_poll_ms: u64,
) -> BootOutcome
where
    H: HttpTransport,
    S: CredentialStore,
    R: RenderAdapter,
    C: Clock,
{
    let mut credentials = store.load_or_create(entropy).unwrap_or_else(|_| {
        warn!("session: credential store unavailable; identity is volatile");
        StoredCredentials::generated(entropy)
    });
    info!(
        "session: device_id={} logged_in={}",
        credentials.device_id, credentials.logged_in
    );

    let logged_in = credentials.logged_in;
    shared.try_write(|snapshot| *snapshot = PlaybackSnapshot::loading(logged_in));

    let mut tokens = TokenManager::new(auth.base_url, &credentials.device_id, auth.secret);

    if credentials.logged_in {
        report("connecting", renderer.show_connecting());
        if tokens.refresh(http).await.is_err() {
            warn!("session: boot refresh failed; dropping login");
            if let Err(err) = store.set_logged_in(false) {
                warn!("session: logout not persisted err={:?}", err);
            }
            return BootOutcome::RestartRequired;
        }
        return BootOutcome::Ready(Session {
            tokens,
            credentials,
        });
    }

    info!("session: starting login flow");
    let login_url = tokens.login_url();
    report("login", renderer.show_qr(&login_url, LOGIN_TITLE, LOGIN_WAITING));
    tokens
        .login(http, clock, login_poll_ms, |attempt| {
            let mut footer = String::<24>::new();
            let _ = write!(footer, "Polling {}", attempt);
            report("login", renderer.show_qr(&login_url, LOGIN_TITLE, &footer));
        })
        .await;

    if let Err(err) = store.set_logged_in(true) {
        warn!("session: login not persisted err={:?}", err);
    }
    credentials.logged_in = true;
    shared.try_write(|snapshot| snapshot.logged_in = true);
    report("clear", renderer.clear_screen());

    BootOutcome::Ready(Session {
        tokens,
        credentials,
    })
}
