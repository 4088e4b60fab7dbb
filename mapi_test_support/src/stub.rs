//! In-memory stand-in for the merchant API.
//!
//! Keeps one ordered collection per endpoint and answers the generic verbs the
//! way the service does: `409` on a repeated natural key, paginated listings
//! of item URIs, `302` from `last_settlement/`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use mapi_core::transport::*;
use mapi_core::wire;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

pub const DEFAULT_PAGE_SIZE: usize = 2;

#[derive(Default)]
struct State {
    collections: HashMap<String, Vec<(String, Value)>>,
    seq: u64,
    requests: Vec<OutboundRequest>,
}

#[derive(Clone)]
pub struct StubMerchantApi {
    host: String,
    page_size: usize,
    verifier: Option<RsaPublicKey>,
    st: Arc<Mutex<State>>,
}

impl StubMerchantApi {
    /// `host` is what the client is configured with, e.g. `https://stub.test`.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            verifier: None,
            st: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }

    /// Rejects with `401` any request whose RSA-SHA256 signature does not verify.
    pub fn verify_with(mut self, key: RsaPublicKey) -> Self {
        self.verifier = Some(key);
        self
    }

    /// Preloads an item, e.g. settlements or status codes.
    pub fn seed(&self, endpoint: &str, id: &str, item: Value) {
        let mut st = self.st.lock().unwrap();
        st.collections
            .entry(endpoint.to_string())
            .or_default()
            .push((id.to_string(), item));
    }

    pub fn items(&self, endpoint: &str) -> Vec<Value> {
        let st = self.st.lock().unwrap();
        st.collections
            .get(endpoint)
            .map(|c| c.iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.st.lock().unwrap().requests.clone()
    }

    pub fn item_uri(&self, endpoint: &str, id: &str) -> String {
        format!("{}{}/{}/{}/", self.host, wire::API_PATH, endpoint, id)
    }

    fn collection_uri(&self, endpoint: &str) -> String {
        format!("{}{}/{}/", self.host, wire::API_PATH, endpoint)
    }

    fn handle(&self, req: &OutboundRequest) -> Reply {
        self.st.lock().unwrap().requests.push(req.clone());

        if !req.headers.contains_key(wire::MERCHANT_HEADER) {
            return Reply::error(StatusCode::BAD_REQUEST, "missing X-Mcash-Merchant");
        }
        if let Some(key) = &self.verifier {
            if let Err(why) = verify(key, req) {
                return Reply::error(StatusCode::UNAUTHORIZED, why);
            }
        }

        let Ok(url) = url::Url::parse(&req.url) else {
            return Reply::error(StatusCode::BAD_REQUEST, "bad url");
        };
        let Some(rest) = url.path().strip_prefix(wire::API_PATH) else {
            return Reply::error(StatusCode::NOT_FOUND, "unknown api");
        };
        let segs: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let page = url
            .query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);

        match (&req.method, segs.as_slice()) {
            (&Method::GET, [wire::LAST_SETTLEMENT]) => self.last_settlement(),
            (&Method::POST, [coll]) => self.create(coll, req.body_bytes()),
            (&Method::GET, [coll]) => self.list(coll, page),
            (&Method::GET, [coll, id]) => self.get(coll, id),
            (&Method::PUT, [coll, id]) => self.update(coll, id, req.body_bytes()),
            (&Method::DELETE, [coll, id]) => self.delete(coll, id),
            (&Method::GET, [coll, id, "outcome"]) => match self.get(coll, id) {
                r if r.status == StatusCode::OK => {
                    Reply::json(StatusCode::OK, json!({"status": "pending"}))
                }
                r => r,
            },
            (&Method::PUT, [coll, id, "ticket"]) => match self.get(coll, id) {
                r if r.status == StatusCode::OK => Reply::empty(StatusCode::NO_CONTENT),
                r => r,
            },
            _ => Reply::error(StatusCode::METHOD_NOT_ALLOWED, "unsupported route"),
        }
    }

    fn create(&self, coll: &str, body: &[u8]) -> Reply {
        let mut obj = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(o)) => o,
            _ => return Reply::error(StatusCode::BAD_REQUEST, "body must be a JSON object"),
        };
        let mut st = self.st.lock().unwrap();
        st.seq += 1;
        let seq = st.seq;
        let items = st.collections.entry(coll.to_string()).or_default();

        let keys = natural_key(coll);
        if !keys.is_empty() {
            let dup = items.iter().any(|(_, v)| keys.iter().all(|k| v.get(*k) == obj.get(*k)));
            if dup {
                let description = format!("{coll} already exists");
                return Reply::json(
                    StatusCode::CONFLICT,
                    json!({"error_type": "conflict", "error_description": description}),
                );
            }
        }

        let id = match obj.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => format!("{coll}-{seq}"),
        };
        obj.insert("id".into(), Value::String(id.clone()));
        items.push((id.clone(), Value::Object(obj)));
        Reply::json(StatusCode::CREATED, json!({"id": id, "uri": self.item_uri(coll, &id)}))
    }

    fn list(&self, coll: &str, page: usize) -> Reply {
        let st = self.st.lock().unwrap();
        let ids: Vec<&str> = st
            .collections
            .get(coll)
            .map(|c| c.iter().map(|(id, _)| id.as_str()).collect())
            .unwrap_or_default();
        let start = page * self.page_size;
        let uris: Vec<Value> = ids
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|id| Value::String(self.item_uri(coll, id)))
            .collect();
        let base = self.collection_uri(coll);
        let next = (start + self.page_size < ids.len())
            .then(|| format!("{base}?page={}", page + 1));
        let prev = (page > 0).then(|| format!("{base}?page={}", page - 1));
        Reply::json(StatusCode::OK, json!({"uris": uris, "next": next, "prev": prev}))
    }

    fn get(&self, coll: &str, id: &str) -> Reply {
        let st = self.st.lock().unwrap();
        match find(&st, coll, id) {
            Some(v) => Reply::json(StatusCode::OK, v.clone()),
            None => Reply::error(StatusCode::NOT_FOUND, "not found"),
        }
    }

    fn update(&self, coll: &str, id: &str, body: &[u8]) -> Reply {
        let patch: Map<String, Value> = match serde_json::from_slice(body) {
            Ok(p) => p,
            Err(_) => return Reply::error(StatusCode::BAD_REQUEST, "body must be a JSON object"),
        };
        let mut st = self.st.lock().unwrap();
        let Some((_, Value::Object(item))) = st
            .collections
            .get_mut(coll)
            .and_then(|c| c.iter_mut().find(|(i, _)| i == id))
        else {
            return Reply::error(StatusCode::NOT_FOUND, "not found");
        };
        item.extend(patch);
        Reply::empty(StatusCode::NO_CONTENT)
    }

    fn delete(&self, coll: &str, id: &str) -> Reply {
        let mut st = self.st.lock().unwrap();
        let Some(items) = st.collections.get_mut(coll) else {
            return Reply::error(StatusCode::NOT_FOUND, "not found");
        };
        let before = items.len();
        items.retain(|(i, _)| i != id);
        if items.len() == before {
            return Reply::error(StatusCode::NOT_FOUND, "not found");
        }
        Reply::empty(StatusCode::NO_CONTENT)
    }

    fn last_settlement(&self) -> Reply {
        let st = self.st.lock().unwrap();
        match st.collections.get(wire::SETTLEMENT).and_then(|c| c.last()) {
            Some((id, _)) => {
                let mut r = Reply::empty(StatusCode::FOUND);
                if let Ok(v) = HeaderValue::from_str(&self.item_uri(wire::SETTLEMENT, id)) {
                    r.headers.insert(LOCATION, v);
                }
                r
            }
            None => Reply::error(StatusCode::NOT_FOUND, "no settlement yet"),
        }
    }
}

fn find<'s>(st: &'s State, coll: &str, id: &str) -> Option<&'s Value> {
    st.collections
        .get(coll)?
        .iter()
        .find(|(i, _)| i == id)
        .map(|(_, v)| v)
}

/// Fields that must be unique within a collection.
fn natural_key(coll: &str) -> &'static [&'static str] {
    match coll {
        wire::PAYMENT_REQUEST | wire::PERMISSION_REQUEST => &["pos_id", "pos_tid"],
        wire::POS | wire::USER => &["id"],
        wire::MERCHANT_SSP_USER => &["email"],
        _ => &[],
    }
}

fn verify(key: &RsaPublicKey, req: &OutboundRequest) -> Result<(), &'static str> {
    let auth = req
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or("missing authorization")?;
    let sig = auth
        .strip_prefix("RSA-SHA256 ")
        .ok_or("not an RSA-SHA256 authorization")?;
    let sig = B64.decode(sig).map_err(|_| "signature is not base64")?;

    let digest = req
        .headers
        .get(wire::CONTENT_DIGEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or("missing content digest")?;
    let expected = format!("SHA256={}", B64.encode(Sha256::digest(req.body_bytes())));
    if digest != expected {
        return Err("content digest does not match body");
    }

    let canonical = mapi_core::canonical_string(&req.method, &req.url, &req.headers)
        .map_err(|_| "headers cannot be canonicalized")?;
    key.verify(
        Pkcs1v15Sign::new::<Sha256>(),
        &Sha256::digest(canonical.as_bytes()),
        &sig,
    )
    .map_err(|_| "bad signature")
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn json(status: StatusCode, v: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Bytes::from(v.to_string()),
        }
    }

    fn error(status: StatusCode, description: &str) -> Self {
        Self::json(status, json!({"error_description": description}))
    }
}

impl Transport for StubMerchantApi {
    fn send<'a>(
        &'a self,
        req: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let r = self.handle(req);
            Ok(TransportResponse {
                status: r.status,
                headers: r.headers,
                body: r.body,
            })
        })
    }
}
