use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::MapiError;

/// Turns request fields into the JSON value that gets sent.
///
/// Top-level `null` fields are dropped so optional parameters left unset never
/// reach the wire.
pub(crate) fn to_fields<B: Serialize + ?Sized>(fields: &B) -> Result<Value, MapiError> {
    let mut value = serde_json::to_value(fields).map_err(MapiError::Encode)?;
    strip_nulls(&mut value);
    Ok(value)
}

pub(crate) fn strip_nulls(value: &mut Value) {
    if let Value::Object(obj) = value {
        obj.retain(|_, v| !v.is_null());
    }
}

/// Compact JSON encoding. These bytes are both signed and transmitted.
pub(crate) fn encode_body(value: &Value) -> Result<Bytes, MapiError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(MapiError::Encode)
}

pub(crate) fn is_text_content_type(ct: &str) -> bool {
    ct.is_empty() || ct.contains("json") || ct.starts_with("text/")
}

pub(crate) fn format_bytes_for_debug(text: bool, bytes: &[u8], max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text {
        // Worst case UTF-8 expansion for lossy preview: cap by ~4 bytes per char.
        let max_bytes = max_chars.saturating_mul(4).max(1);
        let slice_len = bytes.len().min(max_bytes);
        let s0 = String::from_utf8_lossy(&bytes[..slice_len]).to_string();
        let mut s = truncate_for_debug(&s0, max_chars);
        if slice_len < bytes.len() && !s.ends_with('…') {
            s.push('…');
        }
        s
    } else {
        // base64 expands 3 bytes -> 4 chars.
        let max_bytes = max_chars.saturating_mul(3).div_ceil(4).max(1);
        let slice_len = bytes.len().min(max_bytes);
        let s0 = STANDARD_NO_PAD.encode(&bytes[..slice_len]);
        let mut s = truncate_for_debug(&s0, max_chars);
        if slice_len < bytes.len() && !s.ends_with('…') {
            s.push('…');
        }
        s
    }
}

pub(crate) fn truncate_for_debug(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let mut it = s.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        match it.next() {
            Some(c) => out.push(c),
            None => return out,
        }
    }
    if it.next().is_some() {
        out.push('…');
    }
    out
}
