//! The `Mailer` trait, the seam to the transactional email provider.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// A fully rendered email, ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
  pub from:    String,
  pub to:      String,
  pub subject: String,
  pub html:    String,
}

/// What the provider hands back for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
  pub message_id: String,
}

/// A transactional email provider.
///
/// One call is one send: implementations do not retry and carry no
/// idempotency key, so calling twice delivers twice.
pub trait Mailer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    email: OutgoingEmail,
  ) -> impl Future<Output = Result<SendReceipt, Self::Error>> + Send + '_;
}

/// Sender settings shared by the test-email endpoint and test runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
  /// Fixed `From:` header, e.g. `Splitmail <onboarding@resend.dev>`.
  pub from:         String,
  /// Append an [`crate::send::EmailSend`] row after each test-run send.
  pub record_sends: bool,
}

impl Default for DeliveryConfig {
  fn default() -> Self {
    Self {
      from:         DEFAULT_FROM.to_owned(),
      record_sends: true,
    }
  }
}

pub const DEFAULT_FROM: &str = "Splitmail <onboarding@resend.dev>";
