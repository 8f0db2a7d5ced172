//! `POST /send-test-email`: render and send one email from an ad-hoc
//! recipient and variant, without touching the store.
//!
//! Body:
//!
//! ```json
//! {
//!   "recipient": { "first_name": "Ann", "email": "ann@example.com" },
//!   "variant":   { "subject_line": "Sale", "headline": "50% off", "html_body": "<p>Hi {{firstName}}</p>" },
//!   "campaignName": "June"
//! }
//! ```
//!
//! Success: `200 {"success":true,"messageId":"..."}`. Any delivery failure:
//! `500 {"error":"Failed to send email"}`.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use splitmail_core::{
  delivery::Mailer,
  render::{Addressee, Content, compose},
  store::CampaignStore,
};
use tracing::{error, info};

use crate::{ApiState, error::ApiError, extract::JsonBody};

pub const FAILURE_MESSAGE: &str = "Failed to send email";

#[derive(Debug, Deserialize)]
pub struct TestRecipient {
  #[serde(alias = "firstName")]
  pub first_name: String,
  pub email:      String,
}

#[derive(Debug, Deserialize)]
pub struct TestVariant {
  #[serde(alias = "subject")]
  pub subject_line: String,
  #[serde(default)]
  pub headline:     String,
  #[serde(default, alias = "email_body", alias = "emailBody")]
  pub html_body:    String,
}

#[derive(Debug, Deserialize)]
pub struct TestEmailBody {
  pub recipient:     TestRecipient,
  pub variant:       TestVariant,
  #[serde(default, alias = "campaignName")]
  pub campaign_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEmailResponse {
  pub success:    bool,
  pub message_id: String,
}

/// `POST /send-test-email`
pub async fn send<S, M>(
  State(state): State<ApiState<S, M>>,
  JsonBody(body): JsonBody<TestEmailBody>,
) -> Result<Json<TestEmailResponse>, ApiError>
where
  S: CampaignStore,
  M: Mailer,
{
  let email = compose(
    &state.delivery.from,
    Addressee {
      first_name: &body.recipient.first_name,
      email:      &body.recipient.email,
    },
    Content {
      subject_line: &body.variant.subject_line,
      headline:     &body.variant.headline,
      body:         &body.variant.html_body,
    },
  );

  match state.mailer.send(email).await {
    Ok(receipt) => {
      info!(
        to = %body.recipient.email,
        campaign = body.campaign_name.as_deref().unwrap_or("-"),
        message_id = %receipt.message_id,
        "test email sent"
      );
      Ok(Json(TestEmailResponse { success: true, message_id: receipt.message_id }))
    }
    Err(e) => {
      error!(to = %body.recipient.email, error = %e, "error sending email");
      Err(ApiError::Delivery(FAILURE_MESSAGE.to_owned()))
    }
  }
}
