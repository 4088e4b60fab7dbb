use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};

use crate::codec;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(u8)]
pub enum DebugLevel {
    #[default]
    None = 0,
    /// Request line and response status.
    V = 1,
    /// Adds headers and body previews.
    VV = 2,
}

impl DebugLevel {
    #[inline]
    pub fn is_verbose(self) -> bool {
        self >= DebugLevel::V
    }

    #[inline]
    pub fn is_very_verbose(self) -> bool {
        self >= DebugLevel::VV
    }
}

impl core::fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DebugLevel::None => f.write_str("none"),
            DebugLevel::V => f.write_str("v"),
            DebugLevel::VV => f.write_str("vv"),
        }
    }
}

pub const MAX_BODY_CHARS: usize = 32 * 1024;

/// Receives request/response traces from the client.
///
/// Header values reaching a sink have already been passed through
/// [`header_value_for_debug`] by the built-in sinks; custom sinks should do
/// the same.
pub trait DebugSink: Send + Sync + 'static {
    fn request_start(&self, dbg: DebugLevel, method: &Method, url: &str, page_index: u32);
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap);
    fn request_body(&self, dbg: DebugLevel, body: &Bytes);
    fn response_status(&self, dbg: DebugLevel, status: StatusCode, url: &str, ok: bool);
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap);
    fn response_body(&self, dbg: DebugLevel, headers: &HeaderMap, body: &Bytes);
}

#[derive(Default)]
pub struct NoopDebugSink;
impl DebugSink for NoopDebugSink {
    #[inline]
    fn request_start(&self, _: DebugLevel, _: &Method, _: &str, _: u32) {}
    #[inline]
    fn request_headers(&self, _: DebugLevel, _: &HeaderMap) {}
    #[inline]
    fn request_body(&self, _: DebugLevel, _: &Bytes) {}
    #[inline]
    fn response_status(&self, _: DebugLevel, _: StatusCode, _: &str, _: bool) {}
    #[inline]
    fn response_headers(&self, _: DebugLevel, _: &HeaderMap) {}
    #[inline]
    fn response_body(&self, _: DebugLevel, _: &HeaderMap, _: &Bytes) {}
}

/// Plain stderr output.
pub struct StderrDebugSink;
impl DebugSink for StderrDebugSink {
    fn request_start(&self, dbg: DebugLevel, method: &Method, url: &str, page_index: u32) {
        if page_index == 0 {
            eprintln!("[mapi:{}] -> {} {}", dbg, method, url);
        } else {
            eprintln!("[mapi:{}] -> {} {} page={}", dbg, method, url, page_index);
        }
    }
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        eprintln!("[mapi:{}] request headers:", dbg);
        for (k, v) in headers.iter() {
            eprintln!("  {}: {}", k, header_value_for_debug(k, v));
        }
    }
    fn request_body(&self, dbg: DebugLevel, body: &Bytes) {
        let preview = codec::format_bytes_for_debug(true, body, MAX_BODY_CHARS);
        eprintln!("[mapi:{}] request body ({} bytes): {}", dbg, body.len(), preview);
    }
    fn response_status(&self, dbg: DebugLevel, status: StatusCode, url: &str, ok: bool) {
        let tag = if ok { "ok" } else { "error" };
        eprintln!("[mapi:{}] <- {} {} ({})", dbg, status.as_u16(), url, tag);
    }
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        eprintln!("[mapi:{}] response headers:", dbg);
        for (k, v) in headers.iter() {
            eprintln!("  {}: {}", k, header_value_for_debug(k, v));
        }
    }
    fn response_body(&self, dbg: DebugLevel, headers: &HeaderMap, body: &Bytes) {
        let preview = body_preview(headers, body);
        eprintln!("[mapi:{}] response body ({} bytes): {}", dbg, body.len(), preview);
    }
}

/// Emits `tracing` events under the `mapi` target.
pub struct TracingDebugSink;
impl DebugSink for TracingDebugSink {
    fn request_start(&self, dbg: DebugLevel, method: &Method, url: &str, page_index: u32) {
        tracing::debug!(target: "mapi", level = %dbg, %method, url, page_index, "request");
    }
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        tracing::trace!(
            target: "mapi",
            level = %dbg,
            headers = %headers_for_debug(headers),
            "request headers"
        );
    }
    fn request_body(&self, dbg: DebugLevel, body: &Bytes) {
        let preview = codec::format_bytes_for_debug(true, body, MAX_BODY_CHARS);
        tracing::trace!(
            target: "mapi",
            level = %dbg,
            len = body.len(),
            body = %preview,
            "request body"
        );
    }
    fn response_status(&self, dbg: DebugLevel, status: StatusCode, url: &str, ok: bool) {
        if ok {
            tracing::debug!(
                target: "mapi",
                level = %dbg,
                status = status.as_u16(),
                url,
                "response"
            );
        } else {
            tracing::info!(
                target: "mapi",
                level = %dbg,
                status = status.as_u16(),
                url,
                "error response"
            );
        }
    }
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        tracing::trace!(
            target: "mapi",
            level = %dbg,
            headers = %headers_for_debug(headers),
            "response headers"
        );
    }
    fn response_body(&self, dbg: DebugLevel, headers: &HeaderMap, body: &Bytes) {
        let preview = body_preview(headers, body);
        tracing::trace!(
            target: "mapi",
            level = %dbg,
            len = body.len(),
            body = %preview,
            "response body"
        );
    }
}

fn body_preview(headers: &HeaderMap, body: &Bytes) -> String {
    let ct = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    codec::format_bytes_for_debug(codec::is_text_content_type(ct), body, MAX_BODY_CHARS)
}

fn headers_for_debug(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}", k, header_value_for_debug(k, v)))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn is_sensitive_header_name(name: &HeaderName) -> bool {
    // HeaderName::as_str() is normalized to lowercase.
    let n = name.as_str();
    matches!(n, "authorization" | "proxy-authorization" | "cookie" | "set-cookie")
        || n.contains("token")
        || n.contains("secret")
        || n.contains("api-key")
        || n.contains("apikey")
        || n.ends_with("-key")
}

pub fn header_value_for_debug(name: &HeaderName, value: &HeaderValue) -> String {
    if is_sensitive_header_name(name) {
        "<redacted>".to_string()
    } else {
        value.to_str().unwrap_or("<non-utf8>").to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http::header::{ACCEPT, AUTHORIZATION, COOKIE};

    #[test]
    fn redacts_sensitive_headers_by_name() {
        assert!(is_sensitive_header_name(&AUTHORIZATION));
        assert!(is_sensitive_header_name(&COOKIE));
        assert!(is_sensitive_header_name(&HeaderName::from_static("x-testbed-token")));
        assert!(!is_sensitive_header_name(&HeaderName::from_static("x-mcash-merchant")));
        assert!(!is_sensitive_header_name(&ACCEPT));

        let secret = HeaderValue::from_static("SECRET s3cr3t");
        assert_eq!(header_value_for_debug(&AUTHORIZATION, &secret), "<redacted>");
        assert_eq!(
            header_value_for_debug(&ACCEPT, &HeaderValue::from_static("application/json")),
            "application/json"
        );
    }

    #[test]
    fn header_dump_never_contains_credentials() {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_static("RSA-SHA256 abc"));
        h.insert("x-mcash-user", HeaderValue::from_static("admin"));
        let s = headers_for_debug(&h);
        assert!(s.contains("authorization: <redacted>"));
        assert!(s.contains("x-mcash-user: admin"));
        assert!(!s.contains("abc"));
    }
}
