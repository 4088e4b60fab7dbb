use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use http::StatusCode;
use mapi_core::prelude::*;
use mapi_core::{canonical_string, content_digest};
use mapi_test_support::*;
use mapi_tests::*;
use rsa::Pkcs1v15Sign;
use serde_json::json;
use sha2::{Digest, Sha256};

fn verifies(req: &RecordedRequest) -> bool {
    let auth = req.headers.get("authorization").unwrap().to_str().unwrap();
    let sig = B64.decode(auth.strip_prefix("RSA-SHA256 ").unwrap()).unwrap();
    let canonical = canonical_string(&req.method, &req.url, &req.headers).unwrap();
    test_key()
        .public_key()
        .verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &Sha256::digest(canonical.as_bytes()),
            &sig,
        )
        .is_ok()
}

#[tokio::test]
async fn rsa_signature_covers_transmitted_body() {
    let (transport, handle) = mock()
        .reply(MockReply::json(StatusCode::CREATED, json_bytes(&json!({"id": "pos-1"}))))
        .build();
    let client = rsa_client(transport);

    let out = client
        .create_pos(&CreatePos::new("pos-1", "Till 1", "store"))
        .await
        .unwrap();
    assert_eq!(out["id"], "pos-1");

    handle.assert_recorded_len(1);
    let req = handle.request(0);
    assert_request(&req)
        .method(http::Method::POST)
        .url(&api("pos/"))
        .body_bytes(br#"{"id":"pos-1","name":"Till 1","type":"store"}"#)
        .header("x-mcash-content-digest", &content_digest(req.body_bytes()))
        .header_starts_with("authorization", "RSA-SHA256 ");

    let ts = req.headers.get("x-mcash-timestamp").unwrap().to_str().unwrap();
    assert!(
        chrono::NaiveDateTime::parse_from_str(ts, mapi_core::wire::TIMESTAMP_FORMAT).is_ok(),
        "timestamp {ts:?}"
    );
    assert!(verifies(&req));
    handle.finish();
}

#[tokio::test]
async fn bodyless_get_signs_empty_digest() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(&json!({"id": "u1"}))))
        .build();
    let client = rsa_client(transport);

    client.get_user("u1").await.unwrap();

    let req = handle.request(0);
    assert_request(&req)
        .body_absent()
        .header("x-mcash-content-digest", &content_digest(b""));
    assert!(verifies(&req));
    handle.finish();
}

#[tokio::test]
async fn tampered_request_no_longer_verifies() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(&json!({}))))
        .build();
    rsa_client(transport).get_pos("pos-1").await.unwrap();

    let mut req = handle.request(0);
    assert!(verifies(&req));
    req.headers
        .insert("x-mcash-user", http::HeaderValue::from_static("someone-else"));
    assert!(!verifies(&req));
    handle.finish();
}

#[tokio::test]
async fn ids_are_signed_as_sent() {
    let (transport, handle) = mock()
        .replies([
            MockReply::ok_json(json_bytes(&json!({}))),
            MockReply::ok_json(json_bytes(&json!({}))),
            MockReply::status(StatusCode::NO_CONTENT),
        ])
        .build();
    let client = rsa_client(transport);

    client.get_pos("my till").await.unwrap();
    client.get_payment_request_outcome("p1?x=1").await.unwrap();
    client.update_ticket("a/b#c", &[]).await.unwrap();

    let expected = [
        api("pos/my%20till/"),
        api("payment_request/p1%3Fx=1/outcome/"),
        api("payment_request/a%2Fb%23c/ticket/"),
    ];
    for (i, want) in expected.iter().enumerate() {
        let req = handle.request(i);
        assert_eq!(&req.url, want);
        // What reqwest puts on the wire is the parsed form of the URL.
        assert_eq!(url::Url::parse(&req.url).unwrap().as_str(), req.url);
        assert!(verifies(&req));
        assert_request(&req).query_absent();
    }
    handle.finish();
}

#[tokio::test]
async fn shared_secret_sets_authorization_only() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(&json!({"id": "pos-1"}))))
        .build();
    secret_client(transport).get_pos("pos-1").await.unwrap();

    assert_request(&handle.request(0))
        .header("authorization", &format!("SECRET {SECRET}"))
        .header_absent("x-mcash-timestamp")
        .header_absent("x-mcash-content-digest");
    handle.finish();
}

#[tokio::test]
async fn stub_accepts_only_valid_signatures() {
    let stub = StubMerchantApi::new(HOST).verify_with(test_key().public_key());
    let client = rsa_client(stub.clone());
    client
        .create_payment_request(&CreatePaymentRequest::new(
            "msisdn:4712345678",
            "NOK",
            "10.00",
            "pos-1",
            "tid-1",
            PaymentAction::Auth,
            600,
        ))
        .await
        .unwrap();

    // Same stub, unsigned client.
    let open =
        MapiClient::with_transport(config(), Credential::secret(SECRET), stub.clone()).unwrap();
    let err = open.get_all_pos().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(stub.requests().len(), 2);
}

#[test]
fn pkcs8_and_pkcs1_fixtures_are_the_same_key() {
    let a = RsaSha256Key::from_pem(TEST_RSA_KEY).unwrap();
    let b = RsaSha256Key::from_pem(TEST_RSA_KEY_PKCS8).unwrap();
    assert_eq!(a.public_key(), b.public_key());
    assert!(matches!(
        RsaSha256Key::from_pem("-----BEGIN NOTHING-----"),
        Err(MapiError::Key(_))
    ));
}
