mod auth;
mod client;
mod codec;
mod config;
mod debug;
pub mod error;
mod pagination;
pub mod params;
mod resources;
mod response;
mod secret;
mod timeout;
pub mod transport;

pub use auth::{Credential, RsaSha256Key, Signer, canonical_string, content_digest};
pub use client::{CallOptions, Expect, MapiClient};
pub use config::{Acting, ClientConfig};
pub use error::{MapiError, Result};
pub use response::MapiResponse;

/// Wire-level names shared with test doubles.
pub mod wire {
    pub use crate::auth::{
        CONTENT_DIGEST_HEADER, SIGNED_HEADER_PREFIX, TIMESTAMP_FORMAT, TIMESTAMP_HEADER,
    };
    pub use crate::config::{
        API_PATH, DEFAULT_TIMEOUT, INTEGRATOR_HEADER, JSON_CONTENT_TYPE, MEDIA_TYPE,
        MERCHANT_HEADER, USER_HEADER,
    };
    pub use crate::pagination::{NEXT_FIELD, PREV_FIELD};
    pub use crate::resources::{
        LAST_SETTLEMENT, LEGAL_ENTITY, MERCHANT, MERCHANT_LOOKUP, MERCHANT_SSP_USER,
        PAYMENT_REQUEST, PERMISSION_REQUEST, POS, SETTLEMENT, SHORTLINK, STATUS_CODE, USER,
    };
}

pub mod prelude {
    pub use crate::auth::{Credential, RsaSha256Key, Signer};
    pub use crate::client::{CallOptions, Expect, MapiClient};
    pub use crate::config::{Acting, ClientConfig};
    pub use crate::debug::{
        DebugLevel, DebugSink, NoopDebugSink, StderrDebugSink, TracingDebugSink,
        header_value_for_debug,
    };
    pub use crate::error::MapiError;
    pub use crate::pagination::{Caps, ItemsKey, Page, Pages};
    pub use crate::params::*;
    pub use crate::response::MapiResponse;
    pub use crate::secret::SecretString;
    pub use crate::timeout::TimeoutOverride;
    pub use crate::transport::{
        HttpConfig, OutboundRequest, ReqwestTransport, Transport, TransportError,
        TransportErrorKind, TransportResponse, dispatch,
    };
}
