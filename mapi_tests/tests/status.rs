use bytes::Bytes;
use http::{Method, StatusCode};
use mapi_core::prelude::*;
use mapi_test_support::*;
use mapi_tests::*;
use serde_json::{Value, json};

#[tokio::test]
async fn created_is_success() {
    let (transport, handle) = mock()
        .reply(MockReply::json(StatusCode::CREATED, json_bytes(&json!({"id": "sl-1"}))))
        .build();
    let out = secret_client(transport)
        .create_shortlink(&CreateShortlink::default())
        .await
        .unwrap();
    assert_eq!(out, json!({"id": "sl-1"}));
    assert_request(&handle.request(0)).body_bytes(b"{}");
    handle.finish();
}

#[tokio::test]
async fn not_found_is_a_remote_error_with_the_envelope() {
    let (transport, handle) = mock()
        .reply(MockReply::json(
            StatusCode::NOT_FOUND,
            json_bytes(&json!({"error_type": "not_found"})),
        ))
        .build();
    let err = secret_client(transport)
        .get_payment_request("tid-9")
        .await
        .unwrap_err();

    match &err {
        MapiError::Remote { status, headers, body } => {
            assert_eq!(*status, StatusCode::NOT_FOUND);
            assert_eq!(headers.get("content-type").unwrap(), "application/json");
            assert_eq!(body.as_ref(), br#"{"error_type":"not_found"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_conflict());
    handle.finish();
}

#[tokio::test]
async fn expected_status_is_exact() {
    let (transport, handle) = mock()
        .replies([
            MockReply::status(StatusCode::NO_CONTENT),
            MockReply::ok_json(json_bytes(&json!({}))),
        ])
        .build();
    let client = secret_client(transport);
    let url = api("pos/pos-1/");
    let opts = || CallOptions::new().expect_status(StatusCode::NO_CONTENT);

    let resp = client.do_req(Method::DELETE, &url, None, opts()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.json_opt::<Value>().unwrap().is_none());

    let err = client.do_req(Method::DELETE, &url, None, opts()).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::OK));
    handle.finish();
}

#[tokio::test]
async fn redirect_is_not_success_by_default() {
    let (transport, handle) = mock()
        .reply(MockReply::redirect("https://elsewhere.example.com/"))
        .build();
    let err = secret_client(transport).get_pos("p").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FOUND));
    handle.finish();
}

#[tokio::test]
async fn malformed_body_fails_only_on_decode() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_text(Bytes::from_static(b"definitely { not json")))
        .build();
    let client = secret_client(transport);

    let resp = client
        .do_req(Method::GET, &api("pos/p/"), None, CallOptions::new())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text(), "definitely { not json");
    assert!(matches!(resp.json::<Value>(), Err(MapiError::Decode { .. })));
    handle.finish();
}

#[tokio::test]
async fn update_and_delete_return_the_raw_response() {
    let (transport, handle) = mock()
        .replies([
            MockReply::status(StatusCode::NO_CONTENT),
            MockReply::ok_json(json_bytes(&json!({"id": "pos-1", "name": "Till 2"}))),
            MockReply::status(StatusCode::NO_CONTENT),
        ])
        .build();
    let client = secret_client(transport);

    let resp = client
        .update_pos(&UpdatePos::new("pos-1", "Till 2", "store"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.json_opt::<Value>().unwrap().is_none());

    let resp = client
        .update("pos", "pos-1", &json!({"name": "Till 2", "location": null}))
        .await
        .unwrap();
    assert_eq!(resp.json_opt::<Value>().unwrap().unwrap()["name"], "Till 2");

    let resp = client.delete_pos("pos-1").await.unwrap();
    assert!(resp.body().is_empty());

    assert_request(&handle.request(0))
        .method(Method::PUT)
        .url(&api("pos/pos-1/"))
        .body_json(&json!({"name": "Till 2", "type": "store"}));
    assert_request(&handle.request(1)).body_bytes(br#"{"name":"Till 2"}"#);
    assert_request(&handle.request(2))
        .method(Method::DELETE)
        .body_absent();
    handle.finish();
}

#[tokio::test]
async fn sub_resources_and_tickets() {
    let (transport, handle) = mock()
        .replies([
            MockReply::ok_json(json_bytes(&json!({"status": "ok"}))),
            MockReply::ok_json(json_bytes(&json!({"status": "pending"}))),
            MockReply::status(StatusCode::NO_CONTENT),
        ])
        .build();
    let client = secret_client(transport);

    assert_eq!(client.get_payment_request_outcome("t1").await.unwrap()["status"], "ok");
    assert_eq!(client.get_permission_request_outcome("r1").await.unwrap()["status"], "pending");
    client
        .update_ticket("t1", &[json!({"code_type": "string", "code": "ABC"})])
        .await
        .unwrap();

    assert_request(&handle.request(0)).url(&api("payment_request/t1/outcome/"));
    assert_request(&handle.request(1)).url(&api("permission_request/r1/outcome/"));
    assert_request(&handle.request(2))
        .method(Method::PUT)
        .url(&api("payment_request/t1/ticket/"))
        .body_json(&json!({"tickets": [{"code_type": "string", "code": "ABC"}]}));
    handle.finish();
}

#[tokio::test]
async fn last_settlement_follows_the_redirect() {
    let (transport, handle) = mock()
        .replies([
            MockReply::redirect("/merchant/v1/settlement/s-42/"),
            MockReply::ok_json(json_bytes(&json!({"id": "s-42"}))),
        ])
        .build();
    let out = rsa_client(transport).get_last_settlement().await.unwrap();
    assert_eq!(out["id"], "s-42");

    assert_request(&handle.request(0)).url(&api("last_settlement/"));
    assert_request(&handle.request(1))
        .url(&api("settlement/s-42/"))
        .header_starts_with("authorization", "RSA-SHA256 ");
    handle.finish();
}

#[tokio::test]
async fn shortlink_by_absolute_url() {
    let (transport, handle) = mock()
        .replies([
            MockReply::ok_json(json_bytes(&json!({"id": "sl-1"}))),
            MockReply::ok_json(json_bytes(&json!({"id": "sl-1"}))),
        ])
        .build();
    let client = secret_client(transport);

    let url = api("shortlink/sl-1/");
    client.get_shortlink(&url).await.unwrap();
    client.get_shortlink("sl-1").await.unwrap();
    assert_request(&handle.request(0)).url(&url);
    assert_request(&handle.request(1)).url(&url);
    handle.finish();
}
