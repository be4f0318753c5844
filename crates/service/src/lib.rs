//! Escrow service for the shared secret protocol.
//!
//! Everything behind the HTTP surface lives here:
//! - Secret lifecycle (create, read, update, delete) gated by payments
//! - Caretaker invitation, acceptance and nomination
//! - Unlock consensus and the data key share protocol
//! - Notification delivery and the service clock
//!
//! The binary only loads configuration and runs [`http::run_api`].

pub mod caretakers;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod payment_information;
pub mod payments;
mod request;
pub mod secrets;
pub mod share;
pub mod state;
pub mod unlock;

// Re-export key types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, Environment, NotifierConfig, PaymentsConfig, Timing};
pub use error::ServiceError;
pub use notify::{LogNotifier, MessageKind, Notification, Notifier, NotifyError, WebhookNotifier};
pub use payments::{CouponPayments, FreePayments, PaymentError, PaymentValidator};
pub use state::{State as ServiceState, StateSetupError};
