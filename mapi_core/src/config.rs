use http::HeaderMap;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use std::time::Duration;

use crate::debug::DebugLevel;
use crate::error::MapiError;
use crate::pagination::Caps;
use crate::transport::header_pair;

pub const MEDIA_TYPE: &str = "application/vnd.mcash.api.merchant.v1+json";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const API_PATH: &str = "/merchant/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const MERCHANT_HEADER: &str = "X-Mcash-Merchant";
pub const USER_HEADER: &str = "X-Mcash-User";
pub const INTEGRATOR_HEADER: &str = "X-Mcash-Integrator";

/// On whose behalf requests are made.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Acting {
    User(String),
    Integrator(String),
    /// Only accepted together with a shared-secret credential.
    #[default]
    Nobody,
}

impl Acting {
    pub(crate) fn header(&self) -> Option<(&'static str, &str)> {
        match self {
            Acting::User(id) => Some((USER_HEADER, id)),
            Acting::Integrator(id) => Some((INTEGRATOR_HEADER, id)),
            Acting::Nobody => None,
        }
    }
}

/// Client settings. Consumed by [`MapiClient::new`](crate::MapiClient::new) and
/// immutable afterwards.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: String,
    merchant_id: String,
    acting: Acting,
    headers: Vec<(String, String)>,
    timeout: Duration,
    debug_level: DebugLevel,
    caps: Caps,
}

impl ClientConfig {
    /// `base_url` may be given with or without the `/merchant/v1` suffix.
    pub fn new(base_url: impl Into<String>, merchant_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            merchant_id: merchant_id.into(),
            acting: Acting::Nobody,
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            debug_level: DebugLevel::None,
            caps: Caps::default(),
        }
    }

    pub fn acting_user(mut self, user_id: impl Into<String>) -> Self {
        self.acting = Acting::User(user_id.into());
        self
    }

    pub fn acting_integrator(mut self, integrator_id: impl Into<String>) -> Self {
        self.acting = Acting::Integrator(integrator_id.into());
        self
    }

    /// Extra header sent with every request. Overrides library defaults,
    /// overridden by identity and per-call headers.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = level;
        self
    }

    pub fn with_pagination_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }

    #[inline]
    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    #[inline]
    pub fn acting(&self) -> &Acting {
        &self.acting
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub fn debug_level(&self) -> DebugLevel {
        self.debug_level
    }

    #[inline]
    pub fn pagination_caps(&self) -> Caps {
        self.caps
    }

    /// Host part with any trailing `/merchant/v1` removed.
    pub fn host_url(&self) -> &str {
        let trimmed = self.base_url.trim_end_matches('/');
        trimmed.strip_suffix(API_PATH).unwrap_or(trimmed)
    }

    /// Root all resource URLs are joined onto.
    pub fn api_url(&self) -> String {
        format!("{}{}", self.host_url(), API_PATH)
    }

    /// Library defaults overlaid with the configured headers.
    pub(crate) fn default_headers(&self) -> Result<HeaderMap, MapiError> {
        let mut h = HeaderMap::new();
        h.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        h.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        for (name, value) in &self.headers {
            let (n, v) = header_pair(name, value)?;
            h.insert(n, v);
        }
        Ok(h)
    }

    pub(crate) fn validate(&self, shared_secret: bool) -> Result<(), MapiError> {
        let url = url::Url::parse(self.host_url())
            .map_err(|e| MapiError::config(format!("base_url {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MapiError::config(format!(
                "base_url must be http(s), got {:?}",
                url.scheme()
            )));
        }
        if self.merchant_id.is_empty() {
            return Err(MapiError::config("merchant_id must not be empty"));
        }
        match &self.acting {
            Acting::User(id) | Acting::Integrator(id) if id.is_empty() => {
                Err(MapiError::config("acting user/integrator id must not be empty"))
            }
            Acting::Nobody if !shared_secret => Err(MapiError::config(
                "either an acting user or an acting integrator must be set",
            )),
            _ => Ok(()),
        }
    }
}
