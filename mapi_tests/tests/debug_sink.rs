use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use mapi_core::prelude::*;
use mapi_test_support::*;
use mapi_tests::*;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recording {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Recording {
    fn push(&self, s: String) {
        self.lines.lock().unwrap().push(s);
    }
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl DebugSink for Recording {
    fn request_start(&self, _: DebugLevel, method: &Method, url: &str, page_index: u32) {
        self.push(format!("-> {method} {url} page={page_index}"));
    }
    fn request_headers(&self, _: DebugLevel, headers: &HeaderMap) {
        for (k, v) in headers {
            self.push(format!("{k}: {}", header_value_for_debug(k, v)));
        }
    }
    fn request_body(&self, _: DebugLevel, body: &Bytes) {
        self.push(format!("body {}", String::from_utf8_lossy(body)));
    }
    fn response_status(&self, _: DebugLevel, status: StatusCode, _: &str, ok: bool) {
        self.push(format!("<- {} ok={ok}", status.as_u16()));
    }
    fn response_headers(&self, _: DebugLevel, _: &HeaderMap) {}
    fn response_body(&self, _: DebugLevel, _: &HeaderMap, body: &Bytes) {
        self.push(format!("resp {}", String::from_utf8_lossy(body)));
    }
}

fn client_with(
    level: DebugLevel,
    transport: MockTransport,
    sink: Recording,
) -> MapiClient<MockTransport> {
    let cfg = config().with_debug_level(level);
    MapiClient::with_transport(cfg, Credential::secret(SECRET), transport)
        .unwrap()
        .with_debug_sink(sink)
}

#[tokio::test]
async fn silent_by_default() {
    let sink = Recording::default();
    let (transport, handle) = mock().reply(MockReply::ok_json(json_bytes(&json!({})))).build();
    client_with(DebugLevel::None, transport, sink.clone())
        .get_pos("p")
        .await
        .unwrap();
    assert!(sink.lines().is_empty());
    handle.finish();
}

#[tokio::test]
async fn verbose_logs_request_line_and_status() {
    let sink = Recording::default();
    let (transport, handle) = mock()
        .reply(MockReply::json(StatusCode::NOT_FOUND, json_bytes(&json!({}))))
        .build();
    let _ = client_with(DebugLevel::V, transport, sink.clone()).get_pos("p").await;

    assert_eq!(
        sink.lines(),
        vec![
            format!("-> GET {} page=0", api("pos/p/")),
            "<- 404 ok=false".to_string(),
        ]
    );
    handle.finish();
}

#[tokio::test]
async fn very_verbose_redacts_credentials() {
    let sink = Recording::default();
    let (transport, handle) = mock()
        .reply(MockReply::json(StatusCode::CREATED, json_bytes(&json!({"id": "sl-1"}))))
        .build();
    client_with(DebugLevel::VV, transport, sink.clone())
        .create_shortlink(&CreateShortlink::default())
        .await
        .unwrap();

    let lines = sink.lines();
    assert!(lines.contains(&"authorization: <redacted>".to_string()));
    assert!(lines.contains(&format!("x-mcash-user: {USER}")));
    assert!(lines.contains(&"body {}".to_string()));
    assert!(lines.contains(&r#"resp {"id":"sl-1"}"#.to_string()));
    assert!(lines.iter().all(|l| !l.contains(SECRET)));
    handle.finish();
}
