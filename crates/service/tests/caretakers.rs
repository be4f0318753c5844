//! Integration tests for caretaker invitation, acceptance and removal

mod common;

use http::{Method, StatusCode};
use serde_json::json;

use ::common::prelude::{Digest, SecretKey};
use service::MessageKind;

use crate::common::{data_key, email_address, signed_text, signed_text_of_len, TestService};

#[tokio::test]
async fn test_address_digest_must_match_plaintext_address() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;

    let mut address = email_address("alice@example.com", &owner);
    address["addressDigest"] = json!(Digest::of("mallory@example.com").to_string());

    let (status, body) = service
        .signed(
            &owner,
            Method::POST,
            &format!("/caretakers/{secret_id}/alice"),
            Some(json!({ "addresses": [address] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid addressDigest");
}

#[tokio::test]
async fn test_sixteen_caretakers_at_most() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;

    for i in 0..16 {
        service
            .invite(&owner, &secret_id, &format!("c{i}"), "c@example.com")
            .await;
    }

    let (status, body) = service
        .signed(
            &owner,
            Method::POST,
            &format!("/caretakers/{secret_id}/c16"),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Too many caretakers");

    let (status, body) = service
        .signed(&owner, Method::GET, &format!("/caretakers/{secret_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caretakers"].as_object().unwrap().len(), 16);
}

#[tokio::test]
async fn test_create_requires_owner_or_own_key() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let stranger = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    let uri = format!("/caretakers/{secret_id}/bob");

    let (status, _) = service.anon(Method::POST, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = service
        .signed(&stranger, Method::POST, &uri, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // self registration, addresses signed with the caretaker's own key
    let (status, body) = service
        .signed(
            &stranger,
            Method::POST,
            &uri,
            Some(json!({
                "publicKey": stranger.public().to_string(),
                "addresses": [email_address("bob@example.com", &stranger)],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = service
        .signed(&owner, Method::POST, &uri, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Can't create a caretaker that is already accepted"
    );
}

#[tokio::test]
async fn test_existence_check_reports_acceptance() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let caretaker = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;

    let uri = format!(
        "/caretakers/{secret_id}/alice?secretPublicKey={}",
        owner.public()
    );
    let (status, _) = service.anon(Method::HEAD, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    service.accept(&caretaker, &secret_id, "alice").await;
    let (status, _) = service.anon(Method::HEAD, &uri, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let wrong = format!(
        "/caretakers/{secret_id}/alice?secretPublicKey={}",
        caretaker.public()
    );
    let (status, _) = service.anon(Method::HEAD, &wrong, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = service
        .anon(Method::HEAD, &format!("/caretakers/{secret_id}/alice"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_accepted_caretaker_reads_its_record() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let caretaker = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;
    service.accept(&caretaker, &secret_id, "alice").await;

    let uri = format!("/caretakers/{secret_id}/alice");
    let (status, body) = service.signed(&caretaker, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["publicKey"], caretaker.public().to_string());
    assert_eq!(body["secretPublicKey"], owner.public().to_string());
    assert_eq!(body["addresses"][0]["addressType"], "EMAIL");
    assert!(body["addresses"][0].get("addressDigest").is_none());

    // the first key presented stays bound
    let (status, _) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({ "publicKey": SecretKey::generate().public().to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_caretaker_data_needs_bound_key() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let caretaker = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;
    let uri = format!("/caretakers/{secret_id}/alice");

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({ "caretakerData": signed_text(b"note", &caretaker) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can't set caretakerData without a publicKey");

    service.accept(&caretaker, &secret_id, "alice").await;
    let (status, body) = service
        .signed(
            &caretaker,
            Method::PUT,
            &uri,
            Some(json!({ "caretakerData": signed_text(b"note", &caretaker) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = service
        .signed(
            &caretaker,
            Method::PUT,
            &uri,
            Some(json!({ "data": "A".repeat(2001) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "data field more than 2000 bytes.");
}

#[tokio::test]
async fn test_invite_is_sent_to_registered_address_only() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;
    let uri = format!("/caretakers/{secret_id}/alice/send");

    let (status, _) = service
        .signed(
            &owner,
            Method::POST,
            &uri,
            Some(json!({ "sendType": "INVITE", "address": "eve@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = service
        .signed(
            &owner,
            Method::POST,
            &uri,
            Some(json!({ "sendType": "RECEIPT", "address": "alice@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid sendType");

    let (status, body) = service
        .signed(
            &owner,
            Method::POST,
            &uri,
            Some(json!({
                "sendType": "INVITE",
                "address": "alice@example.com",
                "title": "Grandma's recipes",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let sent = service.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, MessageKind::Invite);
    assert_eq!(sent[0].address, "alice@example.com");
    assert_eq!(sent[0].subject, "Your Shared Secret Invite: Grandma's recipes");
    let link = sent[0].link.as_deref().unwrap();
    assert!(link.contains(&format!("#s={secret_id}/c=alice/")));
}

#[tokio::test]
async fn test_unlock_notices_need_an_unlock_in_progress() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;

    let (status, _) = service
        .signed(
            &owner,
            Method::POST,
            &format!("/caretakers/{secret_id}/alice/send"),
            Some(json!({ "sendType": "UNLOCK", "address": "alice@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(service.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_owner_removes_caretaker() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;
    service
        .invite(&owner, &secret_id, "bob", "bob@example.com")
        .await;

    let (status, body) = service
        .signed(
            &owner,
            Method::DELETE,
            &format!("/caretakers/{secret_id}/alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = service
        .signed(&owner, Method::GET, &format!("/caretakers/{secret_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let caretakers = body["caretakers"].as_object().unwrap();
    assert_eq!(caretakers.len(), 1);
    assert!(caretakers.contains_key("bob"));
}

#[tokio::test]
async fn test_caretaker_ids_survive_listing() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let caretaker = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "bob~1", "bob@example.com")
        .await;
    service.accept(&caretaker, &secret_id, "bob~1").await;

    let (status, body) = service
        .signed(
            &owner,
            Method::POST,
            &format!("/caretakers/{secret_id}/bob~1"),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Can't create a caretaker that is already accepted"
    );

    let (status, body) = service
        .signed(&owner, Method::GET, &format!("/caretakers/{secret_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["caretakers"]["bob~1"]["publicKey"],
        caretaker.public().to_string()
    );
}

#[tokio::test]
async fn test_secret_data_ceiling_is_exact() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    let uri = format!("/caretakers/{secret_id}/alice");

    let (status, body) = service
        .signed(
            &owner,
            Method::POST,
            &uri,
            Some(json!({ "secretData": "A".repeat(1001) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "secretData field too long");

    let (status, body) = service
        .signed(
            &owner,
            Method::POST,
            &uri,
            Some(json!({ "secretData": signed_text_of_len(1000, &owner) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({ "secretData": "A".repeat(1001) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "secretData field too long");

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({ "secretData": signed_text_of_len(1000, &owner) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_caretaker_field_ceilings_are_exact() {
    let service = TestService::new();
    let owner = SecretKey::generate();
    let caretaker = SecretKey::generate();
    let secret_id = service.create_secret(&owner, &data_key()).await;
    service
        .invite(&owner, &secret_id, "alice", "alice@example.com")
        .await;
    service.accept(&caretaker, &secret_id, "alice").await;
    let uri = format!("/caretakers/{secret_id}/alice");

    let (status, body) = service
        .signed(
            &caretaker,
            Method::PUT,
            &uri,
            Some(json!({ "caretakerData": "A".repeat(1001) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "caretakerData field too long");

    let (status, body) = service
        .signed(
            &caretaker,
            Method::PUT,
            &uri,
            Some(json!({ "caretakerData": signed_text_of_len(1000, &caretaker) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = service
        .signed(
            &owner,
            Method::PUT,
            &uri,
            Some(json!({ "data": signed_text_of_len(2000, &owner) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}
