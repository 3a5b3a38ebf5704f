//! HTTPS transport over embassy-net using reqwless.

use embassy_net::{
    dns::DnsSocket,
    tcp::client::{TcpClient, TcpClientState},
};
use embassy_time::{Duration, with_timeout};
use heapless::String;
use log::{debug, warn};
use nowdeck_core::{
    auth::TOKEN_BYTES,
    http::{HttpRequest, HttpResponse, HttpTransport, Method},
};
use reqwless::{
    client::{HttpClient, TlsConfig, TlsVerify},
    request::{Method as WireMethod, RequestBuilder},
};

pub const TLS_READ_BUFFER_BYTES: usize = 16_640;
pub const TLS_WRITE_BUFFER_BYTES: usize = 4_096;
pub const RESPONSE_BUFFER_BYTES: usize = 16_384;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub type HttpsTcpState = TcpClientState<1, 2048, 2048>;

/// Buffers reused by every exchange; large enough for a full player-state
/// document.
pub struct HttpsBuffers {
    tls_read: [u8; TLS_READ_BUFFER_BYTES],
    tls_write: [u8; TLS_WRITE_BUFFER_BYTES],
    response: [u8; RESPONSE_BUFFER_BYTES],
}

impl HttpsBuffers {
    pub const fn new() -> Self {
        Self {
            tls_read: [0; TLS_READ_BUFFER_BYTES],
            tls_write: [0; TLS_WRITE_BUFFER_BYTES],
            response: [0; RESPONSE_BUFFER_BYTES],
        }
    }
}

impl Default for HttpsBuffers {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TransportError {
    Timeout,
    Connect,
    Request,
    Body,
}

/// One TLS connection per exchange. Certificates are not verified.
pub struct ReqwlessTransport<'a> {
    tcp: TcpClient<'a, 1, 2048, 2048>,
    dns: DnsSocket<'a>,
    buffers: &'a mut HttpsBuffers,
    seed: u64,
}

impl<'a> ReqwlessTransport<'a> {
    pub fn new(
        stack: embassy_net::Stack<'a>,
        tcp_state: &'a HttpsTcpState,
        buffers: &'a mut HttpsBuffers,
        seed: u64,
    ) -> Self {
        Self {
            tcp: TcpClient::new(stack, tcp_state),
            dns: DnsSocket::new(stack),
            buffers,
            seed,
        }
    }

    fn next_seed(&mut self) -> u64 {
        // xorshift64; the TLS layer only needs a distinct nonce per session.
        let mut x = self.seed | 1;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.seed = x;
        x
    }
}

const fn wire_method(method: Method) -> WireMethod {
    match method {
        Method::Get => WireMethod::GET,
        Method::Post => WireMethod::POST,
        Method::Put => WireMethod::PUT,
    }
}

impl HttpTransport for ReqwlessTransport<'_> {
    type Error = TransportError;

    async fn send<'s>(
        &'s mut self,
        request: &HttpRequest<'_>,
    ) -> Result<HttpResponse<'s>, Self::Error> {
        let seed = self.next_seed();
        let HttpsBuffers {
            tls_read,
            tls_write,
            response,
        } = &mut *self.buffers;

        let mut authorization = String::<{ TOKEN_BYTES + 8 }>::new();
        if let Some(token) = request.bearer {
            authorization
                .push_str("Bearer ")
                .and_then(|_| authorization.push_str(token))
                .map_err(|_| TransportError::Request)?;
        }
        let bearer_header = [("Authorization", authorization.as_str())];
        let headers: &[(&str, &str)] = if request.bearer.is_some() {
            &bearer_header
        } else {
            &[]
        };

        let rx: &'s mut [u8] = response.as_mut_slice();
        let tls = TlsConfig::new(seed, tls_read, tls_write, TlsVerify::None);
        let client = HttpClient::new_with_tls(&self.tcp, &self.dns, tls);

        debug!("http: {} {}", request.method.as_str(), request.url);
        let exchange = async move {
            let mut client = client;
            let mut handle = client
                .request(wire_method(request.method), request.url)
                .await
                .map_err(|err| {
                    warn!("http: connect failed err={:?}", err);
                    TransportError::Connect
                })?
                .headers(headers)
                .body(&[][..]);
            let reply = handle.send(rx).await.map_err(|err| {
                warn!("http: request failed err={:?}", err);
                TransportError::Request
            })?;
            let status = reply.status.0;
            if status != 200 {
                return Ok(HttpResponse { status, body: &[] });
            }
            let body = reply.body().read_to_end().await.map_err(|err| {
                warn!("http: body read failed err={:?}", err);
                TransportError::Body
            })?;
            Ok::<_, TransportError>(HttpResponse { status, body })
        };

        match with_timeout(REQUEST_TIMEOUT, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!("http: exchange timed out url={}", request.url);
                Err(TransportError::Timeout)
            }
        }
    }
}
