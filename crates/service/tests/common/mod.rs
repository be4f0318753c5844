//! Shared test utilities for driving the service router
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use ::common::model::secret_key;
use ::common::prelude::{
    encode_bin, Digest, Envelope, OwnershipAssertion, SecretKey, OWNERSHIP_HEADER,
};
use object_store::{ObjectStore, SecretStore};
use service::config::Timing;
use service::{
    FreePayments, ManualClock, Notification, Notifier, NotifyError, PaymentValidator,
    ServiceState,
};

pub const START_MILLIS: i64 = 1_700_000_000_000;
pub const QUARANTINE_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;
pub const UNLOCK_TIMEOUT_MILLIS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Plaintext envelope header: version, three length bytes and the signature.
pub const ENVELOPE_OVERHEAD: usize = 4 + 64;

/// Keeps every notification instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestService {
    pub state: ServiceState,
    pub store: Arc<dyn SecretStore>,
    pub clock: ManualClock,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestService {
    pub fn new() -> Self {
        Self::with_payments(Arc::new(FreePayments))
    }

    pub fn with_payments(payments: Arc<dyn PaymentValidator>) -> Self {
        Self::with_store(Arc::new(ObjectStore::in_memory()), payments)
    }

    pub fn with_store(store: Arc<dyn SecretStore>, payments: Arc<dyn PaymentValidator>) -> Self {
        let clock = ManualClock::new(START_MILLIS);
        let notifier = Arc::new(RecordingNotifier::default());
        let timing = Timing {
            unlock_quarantine_millis: QUARANTINE_MILLIS,
            unlock_timeout_millis: UNLOCK_TIMEOUT_MILLIS,
        };
        let state = ServiceState::new(
            store.clone(),
            payments,
            notifier.clone(),
            Arc::new(clock.clone()),
            timing,
        );
        Self {
            state,
            store,
            clock,
            notifier,
        }
    }

    pub fn router(&self) -> Router {
        service::http::router(self.state.clone())
    }

    pub fn now(&self) -> i64 {
        use service::Clock;
        self.clock.now_millis()
    }

    /// Send one request and decode the JSON response body.
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    /// Unauthenticated request.
    pub async fn anon(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call(request(method, uri, body, None)).await
    }

    /// Request carrying an ownership proof for `key` at the current clock.
    pub async fn signed(
        &self,
        key: &SecretKey,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let now = self.now();
        self.call(request(method, uri, body, Some((key, now)))).await
    }

    /// Create a secret owned by `owner` whose readers must know `data_key`.
    pub async fn create_secret(&self, owner: &SecretKey, data_key: &[u8; 64]) -> String {
        let (status, body) = self
            .anon(
                Method::POST,
                "/secrets",
                Some(json!({
                    "publicKey": owner.public().to_string(),
                    "data": secret_data(owner, b"the secret"),
                    "dataKeyDigest": Digest::of(data_key).to_string(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["secretId"].as_str().unwrap().to_string()
    }

    /// Invite `caretaker_id` with one plaintext email address.
    pub async fn invite(&self, owner: &SecretKey, secret_id: &str, caretaker_id: &str, email: &str) {
        let (status, body) = self
            .signed(
                owner,
                Method::POST,
                &format!("/caretakers/{secret_id}/{caretaker_id}"),
                Some(json!({ "addresses": [email_address(email, owner)] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Bind the caretaker's key, accepting the invitation.
    pub async fn accept(&self, caretaker: &SecretKey, secret_id: &str, caretaker_id: &str) {
        let (status, body) = self
            .signed(
                caretaker,
                Method::PUT,
                &format!("/caretakers/{secret_id}/{caretaker_id}"),
                Some(json!({ "publicKey": caretaker.public().to_string() })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Owner stores the caretaker's wrapped data and its address key digest.
    /// An accepted caretaker's addresses are signed with its own key.
    pub async fn nominate(
        &self,
        owner: &SecretKey,
        caretaker: &SecretKey,
        secret_id: &str,
        caretaker_id: &str,
        email: &str,
        address_key: &[u8],
    ) {
        let (status, body) = self
            .signed(
                owner,
                Method::PUT,
                &format!("/caretakers/{secret_id}/{caretaker_id}"),
                Some(json!({
                    "addresses": [email_address(email, caretaker)],
                    "addressKeyDigest": Digest::of(address_key).to_string(),
                    "data": signed_text(b"wrapped data key", owner),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    pub async fn stored_secret_body(&self, secret_id: &str) -> Bytes {
        self.store.get(&secret_key(secret_id)).await.unwrap().body
    }
}

pub fn request(
    method: Method,
    uri: &str,
    body: Option<Value>,
    signer: Option<(&SecretKey, i64)>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method.clone()).uri(uri);
    if let Some((key, timestamp)) = signer {
        let header = OwnershipAssertion::sign(key, method.as_str(), uri, timestamp);
        builder = builder.header(OWNERSHIP_HEADER, header);
    }
    match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Base64 text of a plaintext envelope signed by `key`.
pub fn signed_text(message: &[u8], key: &SecretKey) -> String {
    Envelope::signed(message.to_vec(), key).to_text()
}

/// A signed plaintext envelope whose text is exactly `len` characters.
/// Unpadded base64 has no lengths of the form `4n + 1`.
pub fn signed_text_of_len(len: usize, key: &SecretKey) -> String {
    let message = vec![b'x'; len * 3 / 4 - ENVELOPE_OVERHEAD];
    let text = signed_text(&message, key);
    assert_eq!(text.len(), len);
    text
}

/// Secret body as sent on create: an envelope signed by the owner.
pub fn secret_data(owner: &SecretKey, message: &[u8]) -> String {
    signed_text(message, owner)
}

pub fn email_address(email: &str, key: &SecretKey) -> Value {
    json!({
        "address": signed_text(email.as_bytes(), key),
        "addressType": "EMAIL",
        "addressDigest": Digest::of(email).to_string(),
    })
}

pub fn data_key() -> [u8; 64] {
    [7u8; 64]
}

pub fn encoded(bytes: &[u8]) -> String {
    encode_bin(bytes)
}
