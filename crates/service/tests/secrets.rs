//! Integration tests for the secret lifecycle

mod common;

use std::sync::Arc;

use axum::body::Body;
use bytes::Bytes;
use http::{Method, StatusCode};
use serde_json::json;

use ::common::model::secret_key;
use ::common::prelude::{decode_bin, Digest, OwnershipAssertion, SecretKey, OWNERSHIP_HEADER};
use object_store::{ObjectStore, SecretStore};
use service::payments::{PaymentOption, PaymentOptions, PAYMENT_PERIOD_MILLIS};
use service::CouponPayments;

use crate::common::{
    data_key, encoded, secret_data, signed_text, signed_text_of_len, TestService,
    ENVELOPE_OVERHEAD, START_MILLIS,
};

#[tokio::test]
async fn test_create_accepts_largest_body_and_rejects_one_more_byte() {
    let service = TestService::new();
    let owner = SecretKey::generate();

    let message = vec![b'x'; 1_000_000 - ENVELOPE_OVERHEAD];
    let (status, body) = service
        .anon(
            Method::POST,
            "/secrets",
            Some(json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&owner, &message),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let secret_id = body["secretId"].as_str().unwrap();
    assert_eq!(decode_bin(secret_id).unwrap().len(), 16);
    assert_eq!(service.stored_secret_body(secret_id).await.len(), 1_000_000);

    let message = vec![b'x'; 1_000_001 - ENVELOPE_OVERHEAD];
    let (status, body) = service
        .anon(
            Method::POST,
            "/secrets",
            Some(json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&owner, &message),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Data too big");
}

#[tokio::test]
async fn test_create_validation_messages() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let other = SecretKey::generate();

    let cases = [
        (json!({}), "Missing publicKey"),
        (json!({ "publicKey": owner.public().to_string() }), "Missing data"),
        (
            json!({ "publicKey": "AAAA", "data": secret_data(&owner, b"x") }),
            "Malformed publicKey field",
        ),
        (
            json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&owner, b"x"),
                "dataKeyDigest": "short",
            }),
            "Malformed dataKeyDigest field",
        ),
        (
            json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&other, b"x"),
            }),
            "Data field invalid",
        ),
        (
            json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&owner, b"x"),
                "publishData": signed_text(b"public", &other),
            }),
            "publishData is invalid",
        ),
    ];

    for (request, message) in cases {
        let (status, body) = service.anon(Method::POST, "/secrets", Some(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{message}");
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn test_publish_data_ceiling_is_exact() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let create = |publish_data: String| {
        json!({
            "publicKey": owner.public().to_string(),
            "data": secret_data(&owner, b"x"),
            "publishData": publish_data,
        })
    };

    let (status, body) = service
        .anon(Method::POST, "/secrets", Some(create("A".repeat(1001))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "publishData field too long");

    let (status, body) = service
        .anon(
            Method::POST,
            "/secrets",
            Some(create(signed_text_of_len(1000, &owner))),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let uri = format!("/secrets/{}", body["secretId"].as_str().unwrap());

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({
                "data": secret_data(&owner, b"y"),
                "publishData": "A".repeat(1001),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "publishData field too long");

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({
                "data": secret_data(&owner, b"y"),
                "publishData": signed_text_of_len(1000, &owner),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_owner_reads_back_secret() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;

    let (status, body) = service
        .signed(&owner, Method::GET, &format!("/secrets/{secret_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], secret_data(&owner, b"the secret"));
    assert_eq!(body["publicKey"], owner.public().to_string());
    assert_eq!(body["payDate"], START_MILLIS + PAYMENT_PERIOD_MILLIS);
    assert!(body.get("dataKeyDigest").is_none());
    assert!(body.get("unlockPublicKey").is_none());
}

#[tokio::test]
async fn test_failed_ownership_looks_like_a_missing_secret() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    let uri = format!("/secrets/{secret_id}");

    let (status, body) = service.anon(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Resource not found");

    let (status, _) = service
        .signed(&SecretKey::generate(), Method::GET, &uri, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // a proof for another URL does not carry over
    let header = OwnershipAssertion::sign(&owner, "GET", "/secrets/other", service.now());
    let request = http::Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .header(OWNERSHIP_HEADER, header)
        .body(Body::empty())
        .unwrap();
    let (status, _) = service.call(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = service
        .anon(Method::GET, "/secrets/AAAAAAAAAAAAAAAAAAAAAA", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ownership_proof_expires_after_a_minute() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    let uri = format!("/secrets/{secret_id}");

    let stale = common::request(Method::GET, &uri, None, Some((&owner, service.now() - 60_000)));
    let (status, _) = service.call(stale).await;
    assert_eq!(status, StatusCode::OK);

    let stale = common::request(Method::GET, &uri, None, Some((&owner, service.now() - 60_001)));
    let (status, _) = service.call(stale).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_data_key_digest_is_set_at_most_once() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let (status, body) = service
        .anon(
            Method::POST,
            "/secrets",
            Some(json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&owner, b"v1"),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let secret_id = body["secretId"].as_str().unwrap().to_string();
    let uri = format!("/secrets/{secret_id}");

    let first = Digest::of(b"first key").to_string();
    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({ "data": secret_data(&owner, b"v2"), "dataKeyDigest": first })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // repeating the same digest is fine
    let (status, _) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({ "data": secret_data(&owner, b"v3"), "dataKeyDigest": first })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({
                "data": secret_data(&owner, b"v4"),
                "dataKeyDigest": Digest::of(b"second key").to_string(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can not change dataKeyDigest after set");

    let stored = service.stored_secret_body(&secret_id).await;
    assert_eq!(encoded(&stored), secret_data(&owner, b"v3"));
}

#[tokio::test]
async fn test_update_rotates_owner_key() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let next = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    let uri = format!("/secrets/{secret_id}");

    // the body has to be signed by the key taking over
    let (status, _) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({
                "data": secret_data(&owner, b"rotated"),
                "publicKey": next.public().to_string(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({
                "data": secret_data(&next, b"rotated"),
                "publicKey": next.public().to_string(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = service.signed(&owner, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = service.signed(&next, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicKey"], next.public().to_string());
}

#[tokio::test]
async fn test_update_with_malformed_id_is_missing() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            "/secrets/not-an-id",
            Some(json!({ "data": secret_data(&owner, b"x") })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Missing secret");
}

#[tokio::test]
async fn test_delete_removes_secret_and_caretakers() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;
    let uri = format!("/secrets/{secret_id}");

    let (status, _) = service.anon(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = service.signed(&owner, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    assert!(service
        .store
        .get(&secret_key(&secret_id))
        .await
        .unwrap_err()
        .is_not_found());
    let (status, _) = service
        .signed(
            &owner,
            Method::GET,
            &format!("/caretakers/{secret_id}/alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_published_secret_can_not_be_deleted() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let (status, body) = service
        .anon(
            Method::POST,
            "/secrets",
            Some(json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&owner, b"x"),
                "publishData": signed_text(b"for everyone", &owner),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let secret_id = body["secretId"].as_str().unwrap();

    let (status, body) = service
        .signed(&owner, Method::DELETE, &format!("/secrets/{secret_id}"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can't delete a published secret");
}

#[tokio::test]
async fn test_coupon_payment_is_single_use() {
    let store: Arc<dyn SecretStore> = Arc::new(ObjectStore::in_memory());
    store
        .put("transactions/CPN/WELCOME-1", Bytes::new(), Default::default())
        .await
        .unwrap();
    let mut options = PaymentOptions::new();
    options.insert(
        "CPN".to_string(),
        PaymentOption {
            amount: 0.0,
            token: String::new(),
        },
    );
    let payments = Arc::new(CouponPayments::new(store.clone(), options));
    let service = TestService::with_store(store, payments);
    let owner = SecretKey::generate();

    let request = json!({
        "publicKey": owner.public().to_string(),
        "data": secret_data(&owner, b"paid"),
        "paymentType": "CPN",
        "paymentToken": "WELCOME-1",
    });

    let (status, body) = service
        .anon(
            Method::POST,
            "/secrets",
            Some(json!({
                "publicKey": owner.public().to_string(),
                "data": secret_data(&owner, b"unpaid"),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid payment information");

    let (status, body) = service
        .anon(Method::POST, "/secrets", Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = service.anon(Method::POST, "/secrets", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid payment information");
}
