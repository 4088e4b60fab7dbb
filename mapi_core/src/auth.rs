//! Request signing strategies.
//!
//! Every strategy is a pure function of the request and the held credential
//! (plus the wall clock for the RSA timestamp). Nothing is retained between
//! calls, so one credential can sign any number of in-flight requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use core::fmt;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, Method};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::MapiError;
use crate::secret::SecretString;
use crate::transport::{OutboundRequest, header_pair};

/// Vendor prefix of the headers covered by the RSA signature.
pub const SIGNED_HEADER_PREFIX: &str = "X-Mcash-";
pub const TIMESTAMP_HEADER: &str = "X-Mcash-Timestamp";
pub const CONTENT_DIGEST_HEADER: &str = "X-Mcash-Content-Digest";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Attaches authentication to an outbound request.
pub trait Signer: Send + Sync {
    fn sign(&self, req: OutboundRequest) -> Result<OutboundRequest, MapiError>;
}

/// Credential held by the client. Never serialized; Debug output is redacted.
#[derive(Clone)]
pub enum Credential {
    /// No authentication at all.
    Open,
    /// `Authorization: SECRET <secret>`.
    Secret(SecretString),
    /// RSA-SHA256 request signature.
    RsaSha256(RsaSha256Key),
}

impl Credential {
    #[inline]
    pub fn secret(secret: impl Into<SecretString>) -> Self {
        Credential::Secret(secret.into())
    }

    pub fn rsa_from_pem(pem: &str) -> Result<Self, MapiError> {
        RsaSha256Key::from_pem(pem).map(Credential::RsaSha256)
    }

    pub fn rsa_from_pem_file(path: impl AsRef<Path>) -> Result<Self, MapiError> {
        RsaSha256Key::from_pem_file(path).map(Credential::RsaSha256)
    }

    #[inline]
    pub fn is_secret(&self) -> bool {
        matches!(self, Credential::Secret(_))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Open => f.write_str("Open"),
            Credential::Secret(_) => f.write_str("Secret(<secret>)"),
            Credential::RsaSha256(_) => f.write_str("RsaSha256(<private key>)"),
        }
    }
}

impl Signer for Credential {
    fn sign(&self, req: OutboundRequest) -> Result<OutboundRequest, MapiError> {
        match self {
            Credential::Open => Ok(req),
            Credential::Secret(secret) => sign_secret(secret, req),
            Credential::RsaSha256(key) => key.sign(req),
        }
    }
}

fn sign_secret(
    secret: &SecretString,
    mut req: OutboundRequest,
) -> Result<OutboundRequest, MapiError> {
    if secret.is_empty() {
        return Err(MapiError::Signing("shared secret is empty".into()));
    }
    let value = HeaderValue::from_str(&format!("SECRET {}", secret.expose())).map_err(|_| {
        MapiError::Signing("shared secret is not a valid header value".into())
    })?;
    req.headers.insert(AUTHORIZATION, value);
    Ok(req)
}

/// RSA private key used for `RSA-SHA256` request signatures.
#[derive(Clone)]
pub struct RsaSha256Key {
    key: RsaPrivateKey,
}

impl RsaSha256Key {
    #[inline]
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Accepts PKCS#1 (`BEGIN RSA PRIVATE KEY`) and PKCS#8 (`BEGIN PRIVATE KEY`) PEM.
    pub fn from_pem(pem: &str) -> Result<Self, MapiError> {
        let key = match RsaPrivateKey::from_pkcs1_pem(pem) {
            Ok(k) => k,
            Err(pkcs1_err) => RsaPrivateKey::from_pkcs8_pem(pem).map_err(|pkcs8_err| {
                MapiError::Key(
                    format!("not a PKCS#1 ({pkcs1_err}) or PKCS#8 ({pkcs8_err}) RSA key").into(),
                )
            })?,
        };
        Ok(Self::new(key))
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, MapiError> {
        let path = path.as_ref();
        let pem = std::fs::read_to_string(path)
            .map_err(|e| MapiError::Key(format!("{}: {e}", path.display()).into()))?;
        Self::from_pem(&pem)
    }

    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey::from(&self.key)
    }

    /// Signs with the given timestamp instead of the current time.
    pub fn sign_at(
        &self,
        mut req: OutboundRequest,
        timestamp: DateTime<Utc>,
    ) -> Result<OutboundRequest, MapiError> {
        let ts = timestamp.format(TIMESTAMP_FORMAT).to_string();
        let (name, value) = header_pair(TIMESTAMP_HEADER, &ts)?;
        req.headers.insert(name, value);

        let digest = content_digest(req.body_bytes());
        let (name, value) = header_pair(CONTENT_DIGEST_HEADER, &digest)?;
        req.headers.insert(name, value);

        let canonical = canonical_string(&req.method, &req.url, &req.headers)?;
        let hashed = Sha256::digest(canonical.as_bytes());
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
            .map_err(|e| MapiError::Signing(e.to_string().into()))?;

        let auth = format!("RSA-SHA256 {}", B64.encode(signature));
        let auth = HeaderValue::from_str(&auth)
            .map_err(|_| MapiError::Signing("signature is not a valid header value".into()))?;
        req.headers.insert(AUTHORIZATION, auth);
        Ok(req)
    }
}

impl Signer for RsaSha256Key {
    fn sign(&self, req: OutboundRequest) -> Result<OutboundRequest, MapiError> {
        self.sign_at(req, Utc::now())
    }
}

impl fmt::Debug for RsaSha256Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RsaSha256Key(<private key>)")
    }
}

/// `SHA256=` followed by the base64 SHA-256 digest of `body`.
pub fn content_digest(body: &[u8]) -> String {
    format!("SHA256={}", B64.encode(Sha256::digest(body)))
}

/// Builds `METHOD|URL|NAME=value&NAME=value` over the vendor-prefixed headers.
///
/// Names are uppercased before both filtering and sorting; the sort is stable
/// so repeated headers keep their insertion order.
pub fn canonical_string(
    method: &Method,
    url: &str,
    headers: &HeaderMap,
) -> Result<String, MapiError> {
    let prefix = SIGNED_HEADER_PREFIX.to_ascii_uppercase();
    let mut signed: Vec<(String, &str)> = Vec::new();
    for (name, value) in headers.iter() {
        let upper = name.as_str().to_ascii_uppercase();
        if !upper.starts_with(&prefix) {
            continue;
        }
        let value = value
            .to_str()
            .map_err(|_| MapiError::Signing(format!("header {upper} is not valid text").into()))?;
        signed.push((upper, value));
    }
    signed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = format!("{}|{}|", method.as_str().to_ascii_uppercase(), url);
    for (i, (name, value)) in signed.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    Ok(out)
}
