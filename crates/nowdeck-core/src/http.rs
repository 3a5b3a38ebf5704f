//! HTTP collaborator seam.

use core::fmt::Debug;

/// URL buffer size used for every request the core builds.
pub const URL_BYTES: usize = 384;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// One outgoing exchange. Bodies are always empty for this API, so a
/// `Content-Length: 0` request is expected for POST/PUT.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HttpRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub bearer: Option<&'a str>,
}

impl<'a> HttpRequest<'a> {
    pub const fn get(url: &'a str) -> Self {
        Self {
            method: Method::Get,
            url,
            bearer: None,
        }
    }

    pub const fn new(method: Method, url: &'a str) -> Self {
        Self {
            method,
            url,
            bearer: None,
        }
    }

    pub const fn with_bearer(mut self, token: &'a str) -> Self {
        self.bearer = Some(token);
        self
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HttpResponse<'b> {
    pub status: u16,
    pub body: &'b [u8],
}

/// Request/response transport. Implementations must bound every exchange
/// with a finite timeout and surface it as an error.
pub trait HttpTransport {
    type Error: Debug;

    async fn send<'s>(
        &'s mut self,
        request: &HttpRequest<'_>,
    ) -> Result<HttpResponse<'s>, Self::Error>;
}

/// Network link state as seen by the API client.
pub trait Connectivity {
    fn is_online(&self) -> bool;
}

impl<N: Connectivity> Connectivity for &N {
    fn is_online(&self) -> bool {
        (**self).is_online()
    }
}
