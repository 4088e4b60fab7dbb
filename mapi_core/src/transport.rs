use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

use crate::auth::Signer;
use crate::error::MapiError;
use crate::response::MapiResponse;

/// A request as it goes on the wire.
///
/// Built fresh for every call. Only the signer mutates `headers`, once per dispatch.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    #[inline]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, MapiError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    #[inline]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bytes that are transmitted; empty when there is no body.
    #[inline]
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or(&[])
    }
}

pub(crate) fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), MapiError> {
    let invalid = || MapiError::InvalidHeader {
        name: name.to_owned(),
    };
    let n = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let v = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((n, v))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => f.write_str("timeout"),
            TransportErrorKind::Connect => f.write_str("connect"),
            TransportErrorKind::Request => f.write_str("request"),
            TransportErrorKind::Body => f.write_str("body"),
        }
    }
}

/// Network-level failure: no response was obtained.
///
/// Backend errors are flattened into a kind and a message; the backend error
/// type itself never crosses this boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    #[inline]
    pub fn new(kind: TransportErrorKind, message: impl fmt::Display) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    #[inline]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Request
        };
        Self::new(kind, e.without_url())
    }
}

/// What a transport hands back: status, headers and the full body.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Injectable transport layer.
///
/// Contract:
/// - Exactly one network round-trip per `send`, no retries, no redirects.
/// - Honors `OutboundRequest::timeout` as a hard deadline.
/// - Never interprets the HTTP status.
/// - Must not leak a concrete HTTP client type in its public surface.
pub trait Transport: Send + Sync + 'static {
    fn send<'a>(
        &'a self,
        req: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;
}

/// Settings for the production transport.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 16,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    #[inline]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_config(config: &HttpConfig) -> Result<Self, MapiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MapiError::Transport(TransportError::from(e)))?;
        Ok(Self::new(client))
    }

    #[inline]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        req: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let mut rb = self
                .client
                .request(req.method.clone(), req.url.as_str())
                .headers(req.headers.clone());
            if let Some(b) = req.body.clone() {
                rb = rb.body(b);
            }
            if let Some(t) = req.timeout {
                rb = rb.timeout(t);
            }
            let resp = rb.send().await?;
            let status = resp.status();
            let headers = resp.headers().clone();
            let body = resp.bytes().await?;
            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }
}

/// Signs `req` and sends it exactly once.
///
/// The status code is returned as-is; classifying it is the caller's job.
pub async fn dispatch<T, S>(
    transport: &T,
    signer: &S,
    req: OutboundRequest,
) -> Result<MapiResponse, MapiError>
where
    T: Transport + ?Sized,
    S: Signer + ?Sized,
{
    dispatch_inspect(transport, signer, req, |_| {}).await
}

/// Same as [`dispatch`], calling `inspect` with the signed request before it is sent.
pub async fn dispatch_inspect<T, S, F>(
    transport: &T,
    signer: &S,
    req: OutboundRequest,
    inspect: F,
) -> Result<MapiResponse, MapiError>
where
    T: Transport + ?Sized,
    S: Signer + ?Sized,
    F: FnOnce(&OutboundRequest),
{
    let signed = signer.sign(req)?;
    inspect(&signed);
    let resp = match transport.send(&signed).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(
                method = %signed.method,
                url = %signed.url,
                error = %e,
                "unable to fetch"
            );
            return Err(e.into());
        }
    };
    Ok(MapiResponse::new(
        signed.method,
        signed.url,
        resp.status,
        resp.headers,
        resp.body,
    ))
}
