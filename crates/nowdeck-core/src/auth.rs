//! Bearer-token acquisition against the device auth service.

use alloc::string::String as JsonString;
use core::fmt::Write;

use heapless::String;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::{
    clock::Clock,
    http::{HttpRequest, HttpTransport, URL_BYTES},
    text::set_truncated,
};

pub const TOKEN_BYTES: usize = 512;
pub const AUTH_BASE_BYTES: usize = 160;
pub const SECRET_BYTES: usize = 64;

pub type AccessToken = String<TOKEN_BYTES>;
pub type AuthUrl = String<URL_BYTES>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthError {
    /// Service unreachable, non-200, malformed body or missing token.
    RefreshFailed,
}

#[derive(Deserialize)]
struct RefreshBody {
    access_token: Option<JsonString>,
}

/// Owns the device identity used for refreshes and the current token.
#[derive(Debug)]
pub struct TokenManager {
    base_url: String<AUTH_BASE_BYTES>,
    device_id: String<40>,
    secret: String<SECRET_BYTES>,
    token: AccessToken,
    last_error: Option<AuthError>,
}

impl TokenManager {
    pub fn new(base_url: &str, device_id: &str, secret: &str) -> Self {
        let mut manager = Self {
            base_url: String::new(),
            device_id: String::new(),
            secret: String::new(),
            token: String::new(),
            last_error: None,
        };
        let _ = set_truncated(&mut manager.base_url, base_url.trim_end_matches('/'));
        let _ = set_truncated(&mut manager.device_id, device_id);
        let _ = set_truncated(&mut manager.secret, secret);
        manager
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn last_error(&self) -> Option<AuthError> {
        self.last_error
    }

    /// URL the user opens to link this device.
    pub fn login_url(&self) -> AuthUrl {
        let mut url = AuthUrl::new();
        let _ = write!(url, "{}/login?deviceId={}", self.base_url, self.device_id);
        url
    }

    fn refresh_url(&self) -> AuthUrl {
        let mut url = AuthUrl::new();
        let _ = write!(
            url,
            "{}/refresh?deviceId={}&authKey={}",
            self.base_url, self.device_id, self.secret
        );
        url
    }

    /// Exchanges the device identity for a fresh token.
    ///
    /// On failure the previous token is kept untouched.
    pub async fn refresh<H: HttpTransport>(&mut self, http: &mut H) -> Result<AccessToken, AuthError> {
        match self.try_refresh(http).await {
            Ok(token) => {
                self.token = token.clone();
                self.last_error = None;
                info!("auth: token refreshed len={}", self.token.len());
                Ok(token)
            }
            Err(err) => {
                self.last_error = Some(err);
                Err(err)
            }
        }
    }

    async fn try_refresh<H: HttpTransport>(&self, http: &mut H) -> Result<AccessToken, AuthError> {
        let url = self.refresh_url();
        let response = http
            .send(&HttpRequest::get(&url))
            .await
            .map_err(|err| {
                warn!("auth: refresh transport failed err={:?}", err);
                AuthError::RefreshFailed
            })?;

        if response.status != 200 {
            warn!("auth: refresh rejected status={}", response.status);
            return Err(AuthError::RefreshFailed);
        }

        let body: RefreshBody = serde_json::from_slice(response.body).map_err(|_| {
            warn!("auth: refresh body malformed bytes={}", response.body.len());
            AuthError::RefreshFailed
        })?;
        let Some(value) = body.access_token.filter(|token| !token.is_empty()) else {
            warn!("auth: refresh body has no access_token");
            return Err(AuthError::RefreshFailed);
        };

        let mut token = AccessToken::new();
        if !set_truncated(&mut token, &value) {
            warn!("auth: token exceeds buffer len={}", value.len());
            return Err(AuthError::RefreshFailed);
        }
        Ok(token)
    }

    /// First-time link: retries the refresh every `poll_ms` until the user
    /// has completed the login handshake. `on_attempt` receives the number
    /// of failed attempts so far before each wait.
    pub async fn login<H, C, F>(
        &mut self,
        http: &mut H,
        clock: &C,
        poll_ms: u64,
        mut on_attempt: F,
    ) -> AccessToken
    where
        H: HttpTransport,
        C: Clock,
        F: FnMut(u32),
    {
        let mut attempts = 0u32;
        loop {
            if let Ok(token) = self.refresh(http).await {
                info!("auth: login complete attempts={}", attempts);
                return token;
            }
            debug!("auth: login pending attempt={}", attempts);
            clock.sleep_ms(poll_ms).await;
            on_attempt(attempts);
            attempts = attempts.saturating_add(1);
        }
    }
}
