use http::StatusCode;
use mapi_core::prelude::*;
use mapi_test_support::*;
use mapi_tests::*;
use serde_json::{Value, json};

fn page(items: &[i64], next: Option<&str>) -> MockReply {
    let items: Vec<Value> = items.iter().map(|i| json!(i)).collect();
    MockReply::ok_json(listing_page(&items, next))
}

#[tokio::test]
async fn three_pages_flatten_in_order() {
    let p2 = api("pos/?cursor=2");
    let p3 = api("pos/?cursor=3");
    let (transport, handle) = mock()
        .replies([
            page(&[1, 2], Some(&p2)),
            page(&[3, 4], Some(&p3)),
            page(&[5], None),
        ])
        .build();

    let out = secret_client(transport).get_all_pos().await.unwrap();
    assert_eq!(out, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);

    handle.assert_recorded_len(3);
    assert_request(&handle.request(0)).url(&api("pos/"));
    assert_request(&handle.request(1)).url(&p2).query_has("cursor", "2");
    assert_request(&handle.request(2)).url(&p3);
    handle.finish();
}

#[tokio::test]
async fn relative_cursors_resolve_against_the_page_url() {
    let (transport, handle) = mock()
        .replies([
            page(&[1], Some("?cursor=2")),
            page(&[2], Some("/merchant/v1/pos/?cursor=3")),
            page(&[3], None),
        ])
        .build();
    let client = secret_client(transport);

    let mut pages = client.pages(api("pos/"));
    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.next, Some(api("pos/?cursor=2")));
    let rest = pages.collect_items().await.unwrap();
    assert_eq!(rest, vec![json!(2), json!(3)]);

    assert_request(&handle.request(1)).url(&api("pos/?cursor=2"));
    assert_request(&handle.request(2)).url(&api("pos/?cursor=3"));
    handle.finish();
}

#[tokio::test]
async fn unparseable_cursor_is_a_protocol_error() {
    let (transport, handle) = mock()
        .reply(page(&[1], Some("http://[::1")))
        .build();
    let err = secret_client(transport).get_all_pos().await.unwrap_err();
    assert!(matches!(err, MapiError::Protocol(ref m) if m.contains("cursor")));
    handle.assert_recorded_len(1);
    handle.finish();
}

#[tokio::test]
async fn single_page_makes_no_follow_up() {
    let (transport, handle) = mock().reply(page(&[7], None)).build();
    let out = secret_client(transport)
        .get("status_code", None)
        .await
        .unwrap();
    assert_eq!(out, json!([7]));
    handle.assert_recorded_len(1);
    handle.finish();
}

#[tokio::test]
async fn empty_string_next_ends_the_walk() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(
            &json!({"settlements": [{"id": "s1"}], "next": "", "prev": ""}),
        )))
        .build();
    let out = secret_client(transport).get_all_settlements().await.unwrap();
    assert_eq!(out, vec![json!({"id": "s1"})]);
    handle.finish();
}

#[tokio::test]
async fn pages_are_fetched_lazily_and_forward_only() {
    let p2 = api("shortlink/?cursor=2");
    let (transport, handle) = mock()
        .replies([
            page(&[1], Some(&p2)),
            page(&[2], None),
            // second traversal starts over from the first URL
            page(&[1], None),
        ])
        .build();
    let client = secret_client(transport);

    let mut pages = client.shortlink_pages();
    handle.assert_recorded_len(0);

    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.items, vec![json!(1)]);
    assert_eq!(first.next.as_deref(), Some(p2.as_str()));
    handle.assert_recorded_len(1);
    assert!(!pages.is_done());

    let second = pages.next_page().await.unwrap().unwrap();
    assert_eq!(second.items, vec![json!(2)]);
    assert!(pages.is_done());
    assert!(pages.next_page().await.is_none());
    assert_eq!(pages.page_index(), 2);
    handle.assert_recorded_len(2);

    let again = client.shortlink_pages().collect_items().await.unwrap();
    assert_eq!(again, vec![json!(1)]);
    assert_request(&handle.request(2)).url(&api("shortlink/"));
    handle.finish();
}

#[tokio::test]
async fn next_link_loop_is_detected() {
    let first = api("pos/");
    let (transport, handle) = mock().reply(page(&[1], Some(&first))).build();

    let err = secret_client(transport).get_all_pos().await.unwrap_err();
    assert!(matches!(err, MapiError::Protocol(ref m) if m.contains("loop")));
    handle.assert_recorded_len(1);
    handle.finish();
}

#[tokio::test]
async fn max_pages_cap_stops_the_walk() {
    let (transport, handle) = mock()
        .replies([
            page(&[1], Some(&api("pos/?cursor=2"))),
            page(&[2], Some(&api("pos/?cursor=3"))),
        ])
        .build();
    let cfg = config().with_pagination_caps(Caps::default().max_pages(2));
    let client = MapiClient::with_transport(cfg, Credential::secret(SECRET), transport).unwrap();

    let err = client.get_all_pos().await.unwrap_err();
    assert!(matches!(err, MapiError::PaginationLimit(_)));
    handle.assert_recorded_len(2);
    handle.finish();
}

#[tokio::test]
async fn max_items_cap_is_enforced() {
    let (transport, handle) = mock().reply(page(&[1, 2, 3], None)).build();
    let client = secret_client(transport);

    let err = client
        .pages(api("pos/"))
        .with_caps(Caps::default().max_items(2))
        .collect_items()
        .await
        .unwrap_err();
    assert!(matches!(err, MapiError::PaginationLimit(_)));
    handle.finish();
}

#[tokio::test]
async fn envelope_errors_are_protocol_errors() {
    let (transport, handle) = mock()
        .replies([
            MockReply::ok_json(json_bytes(&json!({"uris": [1]}))),
            MockReply::ok_json(json_bytes(&json!([1, 2]))),
            MockReply::ok_json(json_bytes(&json!({"a": [1], "b": [2], "next": null}))),
        ])
        .build();
    let client = secret_client(transport);

    for _ in 0..3 {
        let err = client.get_all_pos().await.unwrap_err();
        assert!(matches!(err, MapiError::Protocol(_)), "{err:?}");
    }
    handle.finish();
}

#[tokio::test]
async fn named_items_key_picks_one_collection() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_json(json_bytes(
            &json!({"uris": ["a"], "extra": [1, 2], "next": null}),
        )))
        .build();
    let client = secret_client(transport);

    let out = client
        .pages(api("pos/"))
        .with_items_key(ItemsKey::named("uris"))
        .collect_items()
        .await
        .unwrap();
    assert_eq!(out, vec![json!("a")]);
    handle.finish();
}

#[tokio::test]
async fn failure_mid_walk_discards_partial_items() {
    let (transport, handle) = mock()
        .reply(page(&[1, 2], Some(&api("pos/?cursor=2"))))
        .reply(MockReply::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            json_bytes(&json!({"error_description": "boom"})),
        ))
        .build();

    let err = secret_client(transport).get_all_pos().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.remote_json().unwrap()["error_description"], "boom");
    handle.finish();
}

#[tokio::test]
async fn malformed_page_is_a_decode_error() {
    let (transport, handle) = mock()
        .reply(MockReply::ok_text(bytes::Bytes::from_static(b"<html>")))
        .build();
    let err = secret_client(transport).get_all_pos().await.unwrap_err();
    match err {
        MapiError::Decode { body, .. } => assert_eq!(body, "<html>"),
        other => panic!("unexpected error: {other:?}"),
    }
    handle.finish();
}
