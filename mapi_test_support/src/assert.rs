use crate::mock::RecordedRequest;
use http::Method;
use http::header::HeaderName;
use serde_json::Value;
use std::fmt::Write as _;

pub struct RequestAssert<'a> {
    req: &'a RecordedRequest,
    url: url::Url,
}

pub fn assert_request(req: &RecordedRequest) -> RequestAssert<'_> {
    let url = url::Url::parse(&req.url)
        .unwrap_or_else(|e| panic!("recorded url is not absolute: {:?} ({e})", req.url));
    RequestAssert { req, url }
}

impl<'a> RequestAssert<'a> {
    pub fn method(self, expected: Method) -> Self {
        if self.req.method != expected {
            panic!(
                "method mismatch\n  expected: {expected}\n  got: {}\n  url: {}",
                self.req.method, self.req.url
            );
        }
        self
    }

    pub fn url(self, expected: &str) -> Self {
        if self.req.url != expected {
            panic!(
                "url mismatch\n  expected: {expected}\n  got: {}",
                self.req.url
            );
        }
        self
    }

    pub fn host(self, expected: &str) -> Self {
        let got = self.url.host_str().unwrap_or("");
        if got != expected {
            panic!(
                "host mismatch\n  expected: {expected}\n  got: {got}\n  url: {}",
                self.req.url
            );
        }
        self
    }

    pub fn path(self, expected: &str) -> Self {
        let got = self.url.path();
        if got != expected {
            panic!(
                "path mismatch\n  expected: {expected}\n  got: {got}\n  url: {}",
                self.req.url
            );
        }
        self
    }

    pub fn query_has(self, key: &str, expected_value: &str) -> Self {
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if !pairs.iter().any(|(k, v)| k == key && v == expected_value) {
            panic!(
                "missing query pair\n  expected: {}={}\n  got: {}\n  url: {}",
                key,
                expected_value,
                format_pairs(&pairs),
                self.req.url
            );
        }
        self
    }

    pub fn query_absent(self) -> Self {
        if let Some(q) = self.url.query() {
            panic!("expected no query, got {:?}\n  url: {}", q, self.req.url);
        }
        self
    }

    pub fn timeout(self, expected: Option<std::time::Duration>) -> Self {
        let got = self.req.timeout;
        if got != expected {
            panic!(
                "timeout mismatch\n  expected: {:?}\n  got: {:?}\n  url: {}",
                expected, got, self.req.url
            );
        }
        self
    }

    pub fn body_present(self) -> Self {
        if self.req.body.is_none() {
            panic!("expected body present, but body=None\nurl: {}", self.req.url);
        }
        self
    }

    pub fn body_absent(self) -> Self {
        if self.req.body.is_some() {
            panic!("expected body absent, but body=Some(..)\nurl: {}", self.req.url);
        }
        self
    }

    /// Exact transmitted bytes.
    pub fn body_bytes(self, expected: &[u8]) -> Self {
        let got = self.req.body_bytes();
        if got != expected {
            panic!(
                "body mismatch\n  expected: {}\n  got: {}\n  url: {}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(got),
                self.req.url
            );
        }
        self
    }

    pub fn body_json(self, expected: &Value) -> Self {
        let got: Value = serde_json::from_slice(self.req.body_bytes()).unwrap_or_else(|e| {
            panic!("body is not JSON ({e})\n  url: {}", self.req.url);
        });
        if &got != expected {
            panic!(
                "body mismatch\n  expected: {expected}\n  got: {got}\n  url: {}",
                self.req.url
            );
        }
        self
    }

    pub fn header(self, name: impl IntoHeaderName, expected: &str) -> Self {
        let name = name.into_header_name();
        let got = self.req.headers.get(&name).and_then(|v| v.to_str().ok());
        match got {
            Some(v) if v == expected => {}
            Some(v) => {
                panic!(
                    "header mismatch\n  header: {}\n  expected: {}\n  got: {}\n  url: {}",
                    name, expected, v, self.req.url
                );
            }
            None => {
                panic!(
                    "missing header\n  header: {}\n  expected: {}\n  url: {}",
                    name, expected, self.req.url
                );
            }
        }
        self
    }

    pub fn header_starts_with(self, name: impl IntoHeaderName, prefix: &str) -> Self {
        let name = name.into_header_name();
        let got = self.req.headers.get(&name).and_then(|v| v.to_str().ok());
        if !got.is_some_and(|v| v.starts_with(prefix)) {
            panic!(
                "header prefix mismatch\n  header: {}\n  expected prefix: {}\n  got: {:?}\n  url: {}",
                name, prefix, got, self.req.url
            );
        }
        self
    }

    pub fn header_absent(self, name: impl IntoHeaderName) -> Self {
        let name = name.into_header_name();
        if self.req.headers.contains_key(&name) {
            let got = self.req.headers.get(&name).and_then(|v| v.to_str().ok());
            panic!(
                "expected header absent\n  header: {}\n  got: {:?}\n  url: {}",
                name, got, self.req.url
            );
        }
        self
    }

    pub fn debug_dump(self) -> Self {
        eprintln!("{:#?}", self.req);
        self
    }
}

pub trait IntoHeaderName {
    fn into_header_name(self) -> HeaderName;
}

impl IntoHeaderName for HeaderName {
    fn into_header_name(self) -> HeaderName {
        self
    }
}

impl IntoHeaderName for &'static HeaderName {
    fn into_header_name(self) -> HeaderName {
        self.clone()
    }
}

impl IntoHeaderName for &'static str {
    fn into_header_name(self) -> HeaderName {
        HeaderName::from_bytes(self.as_bytes()).unwrap_or_else(|_| {
            panic!("invalid header name literal: {:?}", self);
        })
    }
}

fn format_pairs(pairs: &[(String, String)]) -> String {
    let mut s = String::new();
    for (i, (k, v)) in pairs.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        let _ = write!(s, "{}={}", k, v);
    }
    s
}
