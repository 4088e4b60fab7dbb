mod assert;
mod mock;
mod stub;

pub use assert::*;
pub use mock::*;
pub use stub::*;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};

/// 1024-bit RSA key, PKCS#1 PEM. Test use only.
pub const TEST_RSA_KEY: &str = include_str!("../fixtures/test_rsa_key.pem");
/// Same key as [`TEST_RSA_KEY`], PKCS#8 PEM.
pub const TEST_RSA_KEY_PKCS8: &str = include_str!("../fixtures/test_rsa_key_pkcs8.pem");

pub fn json_bytes<T: Serialize>(v: &T) -> Bytes {
    Bytes::from(serde_json::to_vec(v).expect("json encode"))
}

/// Listing page body with the given items under `uris`.
pub fn listing_page(items: &[Value], next: Option<&str>) -> Bytes {
    json_bytes(&json!({"uris": items, "next": next, "prev": null}))
}
