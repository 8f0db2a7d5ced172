//! Resend (<https://resend.com>) implementation of [`Mailer`].
//!
//! One `POST /emails` per message, authenticated with a bearer API key. There
//! is no retry and no idempotency key, so calling [`Mailer::send`] twice sends
//! two emails.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use splitmail_core::delivery::{Mailer, OutgoingEmail, SendReceipt};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// Resend answered with a non-2xx status.
  #[error("resend rejected the email ({status}): {body}")]
  Rejected { status: u16, body: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Serialize)]
struct SendRequest<'a> {
  from:    &'a str,
  to:      [&'a str; 1],
  subject: &'a str,
  html:    &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
  id: String,
}

/// HTTP client for the Resend email API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ResendMailer {
  client:   Client,
  api_key:  String,
  base_url: String,
}

impl ResendMailer {
  pub fn new(api_key: impl Into<String>) -> Result<Self> {
    let client = Client::builder().build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: DEFAULT_BASE_URL.to_owned(),
    })
  }

  /// Point the client at a different API host (a proxy or a local fake).
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }
}

impl Mailer for ResendMailer {
  type Error = Error;

  async fn send(&self, email: OutgoingEmail) -> Result<SendReceipt> {
    let resp = self
      .client
      .post(self.url("/emails"))
      .bearer_auth(&self.api_key)
      .json(&SendRequest {
        from:    &email.from,
        to:      [&email.to],
        subject: &email.subject,
        html:    &email.html,
      })
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      warn!(status = status.as_u16(), to = %email.to, "resend rejected email");
      return Err(Error::Rejected { status: status.as_u16(), body });
    }

    let SendResponse { id } = resp.json().await?;
    debug!(message_id = %id, to = %email.to, "email accepted by resend");
    Ok(SendReceipt { message_id: id })
  }
}
