//! Outbound messages to caretakers.
//!
//! Templating and delivery channels live outside this service. A [`Notifier`]
//! hands fully addressed [`Notification`]s to whatever does the sending.

use serde::Serialize;
use url::Url;

use common::prelude::{encode_bin, PublicKey};

pub const DEFAULT_BASE_URL: &str = "https://yoursharedsecret.com/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Invite,
    Unlock,
    Share,
    Notify,
    Receipt,
}

impl MessageKind {
    /// The kinds a client may ask the service to send on its behalf.
    pub fn parse_send_type(text: &str) -> Option<Self> {
        match text {
            "INVITE" => Some(Self::Invite),
            "UNLOCK" => Some(Self::Unlock),
            "SHARE" => Some(Self::Share),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Invite => "Invite",
            Self::Unlock => "Unlock Request",
            Self::Share => "Share",
            Self::Notify => "Notification",
            Self::Receipt => "Receipt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: MessageKind,
    pub address: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Notification {
    pub fn new(kind: MessageKind, address: impl Into<String>) -> Self {
        Self {
            kind,
            address: address.into(),
            subject: subject(kind, None),
            title: None,
            message: None,
            link: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.subject = subject(self.kind, title.as_deref());
        self.title = title;
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    pub fn with_link(mut self, link: String) -> Self {
        self.link = Some(link);
        self
    }
}

fn subject(kind: MessageKind, title: Option<&str>) -> String {
    match title {
        Some(title) if !title.is_empty() => {
            format!("Your Shared Secret {}: {}", kind.label(), title)
        }
        _ => format!("Your Shared Secret {}", kind.label()),
    }
}

/// Link that lets an invited caretaker open the secret in a client.
pub fn invite_link(
    base_url: &Url,
    secret_id: &str,
    caretaker_id: &str,
    address: &str,
    public_key: &PublicKey,
    title: Option<&str>,
) -> String {
    let mut link = format!(
        "{}#s={}/c={}/a={}/u={}",
        base_url,
        secret_id,
        caretaker_id,
        encode_bin(address),
        public_key
    );
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        link.push_str("/t=");
        link.push_str(&encode_bin(title));
    }
    link
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The delivery channel refused the message.
    #[error("notification rejected: {0}")]
    Rejected(String),
    #[error("notification transport failed: {0}")]
    Transport(String),
}

#[async_trait::async_trait]
pub trait Notifier: std::fmt::Debug + Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = ?notification.kind,
            subject = %notification.subject,
            link = ?notification.link,
            "notification not delivered, no notifier configured"
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a delivery service.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(NotifyError::Rejected(status.to_string()));
        }
        if !status.is_success() {
            return Err(NotifyError::Transport(status.to_string()));
        }
        tracing::debug!(kind = ?notification.kind, "notification delivered");
        Ok(())
    }
}
