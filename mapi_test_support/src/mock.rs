use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, LOCATION};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use mapi_core::transport::*;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// One request as the transport saw it, after signing.
pub type RecordedRequest = OutboundRequest;

#[derive(Clone, Debug)]
pub struct MockReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl MockReply {
    pub fn json(status: StatusCode, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn ok_json(body: Bytes) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn ok_text(body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self {
            status: StatusCode::OK,
            headers,
            body,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(StatusCode::FOUND).with_header(
            LOCATION,
            HeaderValue::from_str(location).expect("location header"),
        )
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

type Scripted = Result<MockReply, TransportError>;

#[derive(Debug)]
struct MockState {
    recorded: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<VecDeque<Scripted>>,
}

/// Transport answering from a fixed script, one entry per `send`.
#[derive(Clone)]
pub struct MockTransport {
    st: Arc<MockState>,
}

/// Inspects what the paired [`MockTransport`] received. Panics on drop if
/// scripted replies were left unused.
pub struct MockHandle {
    st: Arc<MockState>,
    finished: bool,
}

#[derive(Default)]
pub struct MockBuilder {
    replies: Vec<Scripted>,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, r: MockReply) -> Self {
        self.replies.push(Ok(r));
        self
    }

    pub fn replies(mut self, rs: impl IntoIterator<Item = MockReply>) -> Self {
        self.replies.extend(rs.into_iter().map(Ok));
        self
    }

    /// The next `send` fails without a response.
    pub fn fail(mut self, kind: TransportErrorKind, message: &str) -> Self {
        self.replies.push(Err(TransportError::new(kind, message)));
        self
    }

    pub fn build(self) -> (MockTransport, MockHandle) {
        let st = Arc::new(MockState {
            recorded: Mutex::new(Vec::new()),
            replies: Mutex::new(self.replies.into_iter().collect()),
        });
        (
            MockTransport { st: st.clone() },
            MockHandle {
                st,
                finished: false,
            },
        )
    }
}

pub fn mock() -> MockBuilder {
    MockBuilder::new()
}

impl MockHandle {
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.st.recorded.lock().unwrap().clone()
    }

    pub fn recorded_len(&self) -> usize {
        self.st.recorded.lock().unwrap().len()
    }

    pub fn request(&self, idx: usize) -> RecordedRequest {
        let reqs = self.recorded();
        reqs.get(idx).cloned().unwrap_or_else(|| {
            panic!("no recorded request #{idx} (recorded {})", reqs.len())
        })
    }

    pub fn assert_recorded_len(&self, expected: usize) {
        let got = self.recorded_len();
        if got != expected {
            let reqs: Vec<(Method, String)> = self
                .recorded()
                .into_iter()
                .map(|r| (r.method, r.url))
                .collect();
            panic!(
                "recorded request count mismatch\n  expected: {expected}\n  got: {got}\n  recorded:\n{:#?}",
                reqs
            );
        }
    }

    pub fn remaining_replies(&self) -> usize {
        self.st.replies.lock().unwrap().len()
    }

    pub fn assert_no_remaining_replies(&self) {
        let left = self.remaining_replies();
        if left != 0 {
            panic!("mock replies not fully consumed: remaining={left}");
        }
    }

    pub fn finish(mut self) {
        self.assert_no_remaining_replies();
        self.finished = true;
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            return;
        }
        let left = self.st.replies.lock().unwrap().len();
        if left != 0 {
            panic!("mock replies not fully consumed (drop): remaining={left}");
        }
    }
}

impl Transport for MockTransport {
    fn send<'a>(
        &'a self,
        req: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            self.st.recorded.lock().unwrap().push(req.clone());

            let reply = {
                let mut g = self.st.replies.lock().unwrap();
                g.pop_front().unwrap_or_else(|| {
                    panic!(
                        "MockTransport: no more scripted replies, but send() was called.\nlast_request={} {}",
                        req.method, req.url
                    );
                })
            }?;

            Ok(TransportResponse {
                status: reply.status,
                headers: reply.headers,
                body: reply.body,
            })
        })
    }
}
