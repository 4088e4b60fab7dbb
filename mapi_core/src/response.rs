use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::MapiError;

/// Response as returned by the remote service. Immutable once built.
///
/// Decoding is deferred: a malformed body only fails when [`json`](Self::json)
/// is called.
#[derive(Clone, Debug)]
pub struct MapiResponse {
    method: Method,
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl MapiResponse {
    pub fn new(
        method: Method,
        url: impl Into<String>,
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            status,
            headers,
            body,
        }
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Method of the request this response answers.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URL of the request this response answers.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, MapiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| MapiError::decode(e, &self.headers, &self.body))
    }

    /// `None` when the body is empty or whitespace, otherwise the decoded body.
    pub fn json_opt<T: DeserializeOwned>(&self) -> Result<Option<T>, MapiError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        self.json().map(Some)
    }

    /// Turns the response into a `Remote` error carrying status, headers and body.
    pub fn into_remote_error(self) -> MapiError {
        MapiError::Remote {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
