//! Playback service client: state polling and self-healing commands.

mod command;
mod player;


use log::{debug, info, warn};

pub use command::{
    API_BASE, PLAYER_STATE_URL, PlayerCommand, RequestUrl, append_device_id, volume_with_delta,
};

use crate::{
    auth::TokenManager,
    clock::Clock,
    config::DeckConfig,
    credentials::{CredentialStore, RemoteDeviceId, SharedStore},
    http::{Connectivity, HttpRequest, HttpTransport, Method},
    shared::SharedPlayback,
    snapshot::PlaybackSnapshot,
    text::bounded,
};
use player::PlayerState;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollError {
    /// No link; nothing was sent.
    Offline,
    /// 401. A token refresh was attempted; the next poll uses its result.
    AuthExpired,
    /// Any status other than 200, 204 or 401.
    Unexpected(u16),
    /// 200 with a body that does not match the player projection.
    Parse,
    Transport,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandError {
    Offline,
    Transport,
    /// 401 and the token refresh failed, so no retry was sent.
    AuthFailed,
    /// 404/403 after any device recovery attempt.
    DeviceUnavailable(u16),
    Rejected(u16),
}

pub struct PlaybackClient<'a, H, N, S, C> {
    http: H,
    net: N,
    tokens: TokenManager,
    shared: &'a SharedPlayback,
    store: &'a SharedStore<S>,
    clock: C,
    config: DeckConfig,
    last_device_id: Option<RemoteDeviceId>,
}

impl<'a, H, N, S, C> PlaybackClient<'a, H, N, S, C>
where
    H: HttpTransport,
    N: Connectivity,
    S: CredentialStore,
    C: Clock,
{
    pub fn new(
        http: H,
        net: N,
        tokens: TokenManager,
        shared: &'a SharedPlayback,
        store: &'a SharedStore<S>,
        clock: C,
        config: DeckConfig,
    ) -> Self {
        Self {
            http,
            net,
            tokens,
            shared,
            store,
            clock,
            config,
            last_device_id: None,
        }
    }

    /// Seeds the recovery target, typically from persisted credentials.
    pub fn with_last_device(mut self, device_id: Option<&str>) -> Self {
        self.last_device_id = device_id.filter(|id| !id.is_empty()).map(bounded);
        self
    }

    pub fn last_device_id(&self) -> Option<&str> {
        self.last_device_id.as_deref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn shared(&self) -> &'a SharedPlayback {
        self.shared
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn is_online(&self) -> bool {
        self.net.is_online()
    }

    /// Fetches the remote player state and publishes it.
    ///
    /// `Ok(None)` means the exchange succeeded but the shared state could
    /// not be locked in time; the next poll catches up.
    pub async fn poll(&mut self) -> Result<Option<PlaybackSnapshot>, PollError> {
        if !self.net.is_online() {
            return Err(PollError::Offline);
        }

        let request = HttpRequest::get(PLAYER_STATE_URL).with_bearer(self.tokens.token());
        let (status, parsed) = {
            let response = self.http.send(&request).await.map_err(|err| {
                warn!("api: poll transport failed err={:?}", err);
                PollError::Transport
            })?;
            let parsed = (response.status == 200)
                .then(|| serde_json::from_slice::<PlayerState>(response.body));
            (response.status, parsed)
        };

        let timeout_ms = self.config.worker.lock_timeout_ms;
        match (status, parsed) {
            (200, Some(Ok(state))) => {
                if let Some(device_id) = state.device_id() {
                    self.remember_device(device_id);
                }
                let artwork_enabled = self.config.artwork_enabled;
                self.publish(timeout_ms, |snapshot| {
                    state.apply_to(snapshot, artwork_enabled)
                })
                .await
            }
            (200, _) => {
                warn!("api: player state malformed");
                Err(PollError::Parse)
            }
            (204, _) => {
                debug!("api: no active device");
                self.publish(timeout_ms, PlaybackSnapshot::mark_no_active_device)
                    .await
            }
            (401, _) => {
                info!("api: token expired; refreshing");
                let _ = self.tokens.refresh(&mut self.http).await;
                Err(PollError::AuthExpired)
            }
            (other, _) => {
                debug!("api: poll status={}", other);
                Err(PollError::Unexpected(other))
            }
        }
    }

    async fn publish(
        &mut self,
        timeout_ms: u64,
        f: impl FnOnce(&mut PlaybackSnapshot),
    ) -> Result<Option<PlaybackSnapshot>, PollError> {
        let written = self
            .shared
            .write(&self.clock, timeout_ms, |snapshot| {
                f(snapshot);
                snapshot.clone()
            })
            .await;
        match written {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(_) => {
                warn!("api: shared state busy; dropping poll result");
                Ok(None)
            }
        }
    }

    fn remember_device(&mut self, device_id: &str) {
        if self.last_device_id.as_deref() == Some(device_id) {
            return;
        }
        info!("api: active device changed id={}", device_id);
        self.last_device_id = Some(bounded(device_id));
        if let Err(err) = self.store.remember_remote_device(device_id) {
            warn!("api: device id not persisted err={:?}", err);
        }
    }

    /// Sends `command` with at most one recovery retry.
    ///
    /// A 401 refreshes the token and repeats the request once. Otherwise a
    /// 404/403 is repeated once against the remembered device, if any.
    pub async fn execute(&mut self, command: &PlayerCommand) -> Result<u16, CommandError> {
        if !self.net.is_online() {
            return Err(CommandError::Offline);
        }

        let method = command.method();
        let mut url = command.url();
        let mut status = self.send(method, &url).await?;

        if status == 401 {
            info!("api: {} unauthorized; refreshing", command.label());
            if self.tokens.refresh(&mut self.http).await.is_err() {
                return Err(CommandError::AuthFailed);
            }
            status = self.send(method, &url).await?;
        } else if matches!(status, 403 | 404) {
            if let Some(device_id) = self.last_device_id.clone() {
                if append_device_id(&mut url, &device_id) {
                    info!(
                        "api: {} status={}; retrying on device={}",
                        command.label(),
                        status,
                        device_id
                    );
                    status = self.send(method, &url).await?;
                }
            }
        }

        match status {
            200..=299 => {
                debug!("api: {} ok status={}", command.label(), status);
                Ok(status)
            }
            403 | 404 => {
                warn!("api: {} no device status={}", command.label(), status);
                Err(CommandError::DeviceUnavailable(status))
            }
            other => {
                warn!("api: {} rejected status={}", command.label(), other);
                Err(CommandError::Rejected(other))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn http_for_test(&self) -> &H {
        &self.http
    }

    async fn send(&mut self, method: Method, url: &str) -> Result<u16, CommandError> {
        let request = HttpRequest::new(method, url).with_bearer(self.tokens.token());
        let response = self.http.send(&request).await.map_err(|err| {
            warn!("api: transport failed err={:?}", err);
            CommandError::Transport
        })?;
        Ok(response.status)
    }
}
