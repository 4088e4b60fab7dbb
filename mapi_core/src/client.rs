use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::auth::Credential;
use crate::codec;
use crate::config::{ClientConfig, MERCHANT_HEADER};
use crate::debug::{DebugSink, TracingDebugSink};
use crate::error::MapiError;
use crate::pagination::{ItemsKey, Page, Pages};
use crate::response::MapiResponse;
use crate::timeout::TimeoutOverride;
use crate::transport::{HttpConfig, OutboundRequest, ReqwestTransport, Transport};
use crate::transport::{dispatch_inspect, header_pair};

/// Which statuses count as success for a call.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Expect {
    /// Any 2xx.
    #[default]
    Success,
    /// Exactly this status, 2xx or not.
    Status(StatusCode),
}

impl Expect {
    #[inline]
    pub fn accepts(self, status: StatusCode) -> bool {
        match self {
            Expect::Success => status.is_success(),
            Expect::Status(s) => status == s,
        }
    }
}

/// Per-call knobs for [`MapiClient::do_req`].
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    headers: Vec<(String, String)>,
    expect: Expect,
    timeout: TimeoutOverride,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wins over every other header source except the signer's.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[inline]
    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    #[inline]
    pub fn expect_status(self, status: StatusCode) -> Self {
        self.expect(Expect::Status(status))
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: TimeoutOverride) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Entry point. Holds no mutable state and can be shared across tasks.
#[derive(Clone)]
pub struct MapiClient<T: Transport = ReqwestTransport> {
    config: ClientConfig,
    api_url: Url,
    headers: HeaderMap,
    credential: Credential,
    transport: T,
    sink: Arc<dyn DebugSink>,
}

impl MapiClient<ReqwestTransport> {
    pub fn new(config: ClientConfig, credential: Credential) -> Result<Self, MapiError> {
        let http = HttpConfig {
            timeout: config.timeout(),
            ..HttpConfig::default()
        };
        Self::with_http_config(config, credential, &http)
    }

    pub fn with_http_config(
        config: ClientConfig,
        credential: Credential,
        http: &HttpConfig,
    ) -> Result<Self, MapiError> {
        let transport = ReqwestTransport::with_config(http)?;
        Self::with_transport(config, credential, transport)
    }
}

impl<T: Transport> MapiClient<T> {
    /// Checks the configuration and precomputes the shared headers.
    pub fn with_transport(
        config: ClientConfig,
        credential: Credential,
        transport: T,
    ) -> Result<Self, MapiError> {
        config.validate(credential.is_secret())?;

        let mut headers = config.default_headers()?;
        let (n, v) = header_pair(MERCHANT_HEADER, config.merchant_id())?;
        headers.insert(n, v);
        if let Some((name, id)) = config.acting().header() {
            let (n, v) = header_pair(name, id)?;
            headers.insert(n, v);
        }

        let api_url = Url::parse(&config.api_url())
            .map_err(|e| MapiError::config(format!("api url: {e}")))?;

        Ok(Self {
            api_url,
            config,
            headers,
            credential,
            transport,
            sink: Arc::new(TracingDebugSink),
        })
    }

    #[inline]
    pub fn with_debug_sink(mut self, sink: impl DebugSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[inline]
    pub fn api_url(&self) -> &str {
        self.api_url.as_str()
    }

    /// `<api>/<endpoint>/`
    pub fn collection_url(&self, endpoint: &str) -> String {
        self.url_for(endpoint, &[])
    }

    /// `<api>/<endpoint>/<id>/`. The id is percent-encoded as a single path
    /// segment, so `/`, `?` and `#` in it never change the route.
    pub fn item_url(&self, endpoint: &str, id: &str) -> String {
        self.url_for(endpoint, &[id])
    }

    /// `<api>/<endpoint>/<id>/<sub>/`
    pub(crate) fn sub_url(&self, endpoint: &str, id: &str, sub: &str) -> String {
        self.url_for(endpoint, &[id, sub])
    }

    fn url_for(&self, endpoint: &str, segments: &[&str]) -> String {
        let mut url = self.api_url.clone();
        // http(s) URLs always have a path; `validate` rejects everything else.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(endpoint.split('/').filter(|s| !s.is_empty()))
                .extend(segments)
                .push("");
        }
        url.into()
    }

    /// POST to the collection, returning the decoded body (`Null` when empty).
    pub async fn create<B>(&self, endpoint: &str, fields: &B) -> Result<Value, MapiError>
    where
        B: Serialize + ?Sized,
    {
        let body = codec::to_fields(fields)?;
        let url = self.collection_url(endpoint);
        let resp = self
            .do_req(Method::POST, &url, Some(body), CallOptions::default())
            .await?;
        Ok(resp.json_opt()?.unwrap_or(Value::Null))
    }

    /// PUT to the item. Many update endpoints answer `204`, so the raw response
    /// is returned.
    pub async fn update<B>(
        &self,
        endpoint: &str,
        id: &str,
        fields: &B,
    ) -> Result<MapiResponse, MapiError>
    where
        B: Serialize + ?Sized,
    {
        let body = codec::to_fields(fields)?;
        let url = self.item_url(endpoint, id);
        self.do_req(Method::PUT, &url, Some(body), CallOptions::default())
            .await
    }

    /// With an id, the decoded item. Without one, every item of the collection
    /// as a JSON array, in page order.
    pub async fn get(&self, endpoint: &str, id: Option<&str>) -> Result<Value, MapiError> {
        match id {
            Some(id) => self.get_url(&self.item_url(endpoint, id)).await,
            None => {
                let items = self.depaginate(&self.collection_url(endpoint)).await?;
                Ok(Value::Array(items))
            }
        }
    }

    pub async fn delete(&self, endpoint: &str, id: &str) -> Result<MapiResponse, MapiError> {
        let url = self.item_url(endpoint, id);
        self.do_req(Method::DELETE, &url, None, CallOptions::default())
            .await
    }

    pub(crate) async fn get_url(&self, url: &str) -> Result<Value, MapiError> {
        self.do_req(Method::GET, url, None, CallOptions::default())
            .await?
            .json()
    }

    /// Follows `next` links from `url` and returns every item in order.
    pub async fn depaginate(&self, url: &str) -> Result<Vec<Value>, MapiError> {
        self.pages(url).collect_items().await
    }

    /// Lazy, forward-only page walk starting at `url`. Nothing is fetched
    /// until the first [`Pages::next_page`].
    pub fn pages(&self, url: impl Into<String>) -> Pages<'_, T> {
        Pages::new(
            self,
            url.into(),
            ItemsKey::Infer,
            self.config.pagination_caps(),
        )
    }

    pub(crate) async fn fetch_page(
        &self,
        url: &str,
        key: &ItemsKey,
        page_index: u32,
    ) -> Result<Page, MapiError> {
        let resp = self
            .send(Method::GET, url, None, CallOptions::default(), page_index)
            .await?;
        Page::from_response(&resp, key)
    }

    /// Sends one request to an absolute URL and classifies the status.
    ///
    /// Top-level `null` fields of `body` are dropped; the remaining compact
    /// JSON is what gets signed and sent. A status rejected by the call's
    /// [`Expect`] becomes [`MapiError::Remote`].
    pub async fn do_req(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        opts: CallOptions,
    ) -> Result<MapiResponse, MapiError> {
        self.send(method, url, body, opts, 0).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        opts: CallOptions,
        page_index: u32,
    ) -> Result<MapiResponse, MapiError> {
        let dbg = self.config.debug_level();

        let mut headers = self.headers.clone();
        for (name, value) in &opts.headers {
            let (n, v) = header_pair(name, value)?;
            headers.insert(n, v);
        }

        // The signature covers the URL exactly as the transport serializes it.
        let url = Url::parse(url).map_err(|source| MapiError::InvalidUrl {
            url: url.to_owned(),
            source,
        })?;
        let mut req = OutboundRequest::new(method, url)
            .with_headers(headers)
            .with_timeout(opts.timeout.resolve(self.config.timeout()));
        if let Some(mut value) = body {
            codec::strip_nulls(&mut value);
            req = req.with_body(codec::encode_body(&value)?);
        }

        if dbg.is_verbose() {
            self.sink.request_start(dbg, &req.method, &req.url, page_index);
        }
        let resp = dispatch_inspect(&self.transport, &self.credential, req, |signed| {
            if dbg.is_very_verbose() {
                self.sink.request_headers(dbg, &signed.headers);
                if let Some(b) = signed.body.as_ref() {
                    self.sink.request_body(dbg, b);
                }
            }
        })
        .await?;

        let ok = opts.expect.accepts(resp.status());
        if dbg.is_verbose() {
            self.sink.response_status(dbg, resp.status(), resp.url(), ok);
        }
        if dbg.is_very_verbose() {
            self.sink.response_headers(dbg, resp.headers());
            self.sink.response_body(dbg, resp.headers(), resp.body());
        }
        if !ok {
            return Err(resp.into_remote_error());
        }
        Ok(resp)
    }
}

impl<T: Transport> fmt::Debug for MapiClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapiClient")
            .field("api_url", &self.api_url.as_str())
            .field("config", &self.config)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}
