//! Host-side doubles shared by the unit tests.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    string::{String, ToString},
    vec::Vec,
};

use crate::{
    clock::Clock,
    http::{Connectivity, HttpRequest, HttpResponse, HttpTransport, Method},
    render::{PopupTone, RenderAdapter},
    snapshot::PlaybackSnapshot,
};

/// Time only moves when a test sleeps or advances it.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Cell<u64>,
    sleeps: RefCell<Vec<u64>>,
}

impl MockClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now: Cell::new(now_ms),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn sleeps(&self) -> Vec<u64> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    async fn sleep_ms(&self, ms: u64) {
        self.sleeps.borrow_mut().push(ms);
        self.advance(ms);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptedHttpError {
    Exhausted,
    Timeout,
}

/// Replays queued responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    responses: VecDeque<Result<(u16, Vec<u8>), ScriptedHttpError>>,
    body: Vec<u8>,
    pub requests: Vec<RecordedRequest>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, status: u16, body: &str) -> Self {
        self.push(status, body);
        self
    }

    pub fn push(&mut self, status: u16, body: &str) {
        self.responses.push_back(Ok((status, body.as_bytes().to_vec())));
    }

    pub fn push_error(&mut self, err: ScriptedHttpError) {
        self.responses.push_back(Err(err));
    }

    pub fn urls(&self) -> Vec<&str> {
        self.requests.iter().map(|r| r.url.as_str()).collect()
    }

    pub fn pending(&self) -> usize {
        self.responses.len()
    }
}

impl HttpTransport for ScriptedHttp {
    type Error = ScriptedHttpError;

    async fn send<'s>(
        &'s mut self,
        request: &HttpRequest<'_>,
    ) -> Result<HttpResponse<'s>, Self::Error> {
        self.requests.push(RecordedRequest {
            method: request.method,
            url: request.url.to_string(),
            bearer: request.bearer.map(ToString::to_string),
        });

        let (status, body) = self
            .responses
            .pop_front()
            .unwrap_or(Err(ScriptedHttpError::Exhausted))?;
        self.body = body;
        Ok(HttpResponse {
            status,
            body: &self.body,
        })
    }
}

#[derive(Debug)]
pub struct FlagNet {
    online: Cell<bool>,
}

impl FlagNet {
    pub fn online() -> Self {
        Self {
            online: Cell::new(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            online: Cell::new(false),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.set(online);
    }
}

impl Connectivity for FlagNet {
    fn is_online(&self) -> bool {
        self.online.get()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RenderEvent {
    Splash,
    Connecting,
    Qr {
        data: String,
        title: String,
        footer: String,
    },
    Popup(String, PopupTone),
    Clear,
    Backlight(bool),
    Snapshot(PlaybackSnapshot),
}

/// Captures every adapter call instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub events: Vec<RenderEvent>,
}

impl RecordingRenderer {
    pub fn take(&mut self) -> Vec<RenderEvent> {
        core::mem::take(&mut self.events)
    }

    pub fn popups(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Popup(text, _) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn snapshot_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, RenderEvent::Snapshot(_)))
            .count()
    }
}

impl RenderAdapter for RecordingRenderer {
    type Error = core::convert::Infallible;

    fn show_splash(&mut self) -> Result<(), Self::Error> {
        self.events.push(RenderEvent::Splash);
        Ok(())
    }

    fn show_connecting(&mut self) -> Result<(), Self::Error> {
        self.events.push(RenderEvent::Connecting);
        Ok(())
    }

    fn show_qr(&mut self, data: &str, title: &str, footer: &str) -> Result<(), Self::Error> {
        self.events.push(RenderEvent::Qr {
            data: data.to_string(),
            title: title.to_string(),
            footer: footer.to_string(),
        });
        Ok(())
    }

    fn show_popup(&mut self, text: &str, tone: PopupTone) -> Result<(), Self::Error> {
        self.events.push(RenderEvent::Popup(text.to_string(), tone));
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<(), Self::Error> {
        self.events.push(RenderEvent::Clear);
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), Self::Error> {
        self.events.push(RenderEvent::Backlight(on));
        Ok(())
    }

    fn render_snapshot(&mut self, snapshot: &PlaybackSnapshot) -> Result<(), Self::Error> {
        self.events.push(RenderEvent::Snapshot(snapshot.clone()));
        Ok(())
    }
}
