use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD as B64;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::borrow::Cow;
use thiserror::Error;

use crate::params::ValidationError;
use crate::transport::TransportError;

pub type Result<T, E = MapiError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MapiError {
    /// No response was obtained. Safe for the caller to retry; never retried internally.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("decode error: {source}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },

    /// Well-formed JSON that does not follow the listing envelope.
    #[error("protocol: {0}")]
    Protocol(Cow<'static, str>),

    #[error("status {status}")]
    Remote {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },

    #[error("pagination limit reached: {0}")]
    PaginationLimit(Cow<'static, str>),

    #[error("invalid parameters: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid client configuration: {0}")]
    Config(Cow<'static, str>),

    #[error("signing failed: {0}")]
    Signing(Cow<'static, str>),

    #[error("private key: {0}")]
    Key(Cow<'static, str>),

    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("invalid header {name}")]
    InvalidHeader { name: String },

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

impl MapiError {
    pub(crate) fn protocol(msg: impl Into<Cow<'static, str>>) -> Self {
        MapiError::Protocol(msg.into())
    }

    pub(crate) fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        MapiError::Config(msg.into())
    }

    pub(crate) fn decode(source: serde_json::Error, headers: &HeaderMap, body: &Bytes) -> Self {
        MapiError::Decode {
            source,
            body: body_as_text(headers, body),
        }
    }

    /// HTTP status of a `Remote` error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MapiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `409 Conflict`: the remote already holds a resource with the same natural key.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, MapiError::Transport(_))
    }

    /// Decoded error envelope of a `Remote` error, if its body is JSON.
    pub fn remote_json(&self) -> Option<serde_json::Value> {
        match self {
            MapiError::Remote { body, .. } => serde_json::from_slice(body).ok(),
            _ => None,
        }
    }
}

pub(crate) fn body_as_text(headers: &HeaderMap, body: &Bytes) -> String {
    const MAX: usize = 8 * 1024;
    let ct = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let slice = if body.len() > MAX { &body[..MAX] } else { &body[..] };
    let is_text = ct.is_empty() || ct.contains("json") || ct.starts_with("text/");
    if is_text {
        let text = match std::str::from_utf8(slice) {
            Ok(s) => Some(s),
            // The cut landed inside a multi-byte character; keep the complete prefix.
            Err(e) if e.error_len().is_none() => {
                std::str::from_utf8(&slice[..e.valid_up_to()]).ok()
            }
            Err(_) => None,
        };
        match text {
            Some(s) if body.len() > slice.len() => format!("{}...", s),
            Some(s) => s.to_owned(),
            None => format!("<non-utf8-text; {} bytes>", body.len()),
        }
    } else {
        let b64 = B64.encode(slice);
        format!(
            "<non-text; {} bytes; base64:{}{}>",
            body.len(),
            &b64[..b64.len().min(1024)],
            if b64.len() > 1024 { "..." } else { "" }
        )
    }
}
