//! Async HTTP client wrapping the Splitmail JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use splitmail_core::{
  campaign::{Campaign, CampaignStatus, NewCampaign},
  recipient::{NewRecipient, Recipient},
  segment::{NewSegment, Segment},
  send::EmailSend,
  test_run::TestRunReport,
  variant::{NewVariant, Variant},
};
use tracing::debug;
use uuid::Uuid;

/// Async HTTP client for the Splitmail REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  /// Send `req` and turn a non-2xx answer into an error carrying the
  /// server's `{"error": ...}` message.
  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
    debug!(request = what, "calling splitmail api");
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    match body.get("error").and_then(Value::as_str) {
      Some(message) => Err(anyhow!("{what} → {status}: {message}")),
      None => Err(anyhow!("{what} → {status}")),
    }
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
    let what = format!("GET {path}");
    let resp = self
      .send(self.client.get(self.url(path)).query(query), &what)
      .await?;
    resp.json().await.with_context(|| format!("deserialising {path}"))
  }

  async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
    let what = format!("POST {path}");
    let resp = self
      .send(self.client.post(self.url(path)).json(body), &what)
      .await?;
    resp.json().await.with_context(|| format!("deserialising {path}"))
  }

  async fn delete(&self, path: &str) -> Result<()> {
    let what = format!("DELETE {path}");
    self.send(self.client.delete(self.url(path)), &what).await?;
    Ok(())
  }

  // ── Recipients ────────────────────────────────────────────────────────────

  /// `GET /api/recipients[?segment=<label>]`
  pub async fn list_recipients(&self, segment: Option<&str>) -> Result<Vec<Recipient>> {
    let query: Vec<_> = segment.map(|s| ("segment", s.to_owned())).into_iter().collect();
    self.get("/recipients", &query).await
  }

  /// `POST /api/recipients`
  pub async fn add_recipient(&self, input: &NewRecipient) -> Result<Recipient> {
    self.post("/recipients", input).await
  }

  /// `DELETE /api/recipients/{id}`
  pub async fn delete_recipient(&self, id: Uuid) -> Result<()> {
    self.delete(&format!("/recipients/{id}")).await
  }

  // ── Segments ──────────────────────────────────────────────────────────────

  pub async fn list_segments(&self) -> Result<Vec<Segment>> { self.get("/segments", &[]).await }

  pub async fn add_segment(&self, input: &NewSegment) -> Result<Segment> {
    self.post("/segments", input).await
  }

  pub async fn delete_segment(&self, id: Uuid) -> Result<()> {
    self.delete(&format!("/segments/{id}")).await
  }

  /// `GET /api/segment-labels`
  pub async fn segment_labels(&self) -> Result<Vec<String>> {
    self.get("/segment-labels", &[]).await
  }

  // ── Variants ──────────────────────────────────────────────────────────────

  /// `GET /api/variants[?segment=<label>]`
  pub async fn list_variants(&self, segment: Option<&str>) -> Result<Vec<Variant>> {
    let query: Vec<_> = segment.map(|s| ("segment", s.to_owned())).into_iter().collect();
    self.get("/variants", &query).await
  }

  pub async fn add_variant(&self, input: &NewVariant) -> Result<Variant> {
    self.post("/variants", input).await
  }

  pub async fn delete_variant(&self, id: Uuid) -> Result<()> {
    self.delete(&format!("/variants/{id}")).await
  }

  // ── Campaigns ─────────────────────────────────────────────────────────────

  pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
    self.get("/campaigns", &[]).await
  }

  pub async fn add_campaign(&self, input: &NewCampaign) -> Result<Campaign> {
    self.post("/campaigns", input).await
  }

  pub async fn delete_campaign(&self, id: Uuid) -> Result<()> {
    self.delete(&format!("/campaigns/{id}")).await
  }

  /// `POST /api/campaigns/{id}/status`
  pub async fn set_status(&self, id: Uuid, status: CampaignStatus) -> Result<Campaign> {
    self
      .post(&format!("/campaigns/{id}/status"), &json!({ "status": status }))
      .await
  }

  /// `POST /api/campaigns/{id}/test-run`
  pub async fn test_run(&self, id: Uuid) -> Result<TestRunReport> {
    self.post(&format!("/campaigns/{id}/test-run"), &json!({})).await
  }

  // ── Sends ─────────────────────────────────────────────────────────────────

  /// `GET /api/sends[?recipient_id=..][&campaign_id=..][&limit=..]`
  pub async fn list_sends(
    &self,
    recipient_id: Option<Uuid>,
    campaign_id: Option<Uuid>,
    limit: Option<usize>,
  ) -> Result<Vec<EmailSend>> {
    let mut query = Vec::new();
    if let Some(id) = recipient_id {
      query.push(("recipient_id", id.to_string()));
    }
    if let Some(id) = campaign_id {
      query.push(("campaign_id", id.to_string()));
    }
    if let Some(n) = limit {
      query.push(("limit", n.to_string()));
    }
    self.get("/sends", &query).await
  }

  /// `POST /api/send-test-email`, returning the provider's message id.
  pub async fn send_test_email(
    &self,
    first_name: &str,
    email: &str,
    subject_line: &str,
    headline: &str,
    html_body: &str,
  ) -> Result<String> {
    let body = json!({
      "recipient": { "first_name": first_name, "email": email },
      "variant": {
        "subject_line": subject_line,
        "headline": headline,
        "html_body": html_body,
      },
    });
    let resp: Value = self.post("/send-test-email", &body).await?;
    resp
      .get("messageId")
      .and_then(Value::as_str)
      .map(str::to_owned)
      .ok_or_else(|| anyhow!("response carried no messageId: {resp}"))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::NaiveDate;
  use splitmail_api::{ApiState, api_router};
  use splitmail_core::{
    campaign::{AssignmentMethod, CampaignSegment},
    delivery::{DeliveryConfig, Mailer, OutgoingEmail, SendReceipt},
  };
  use splitmail_store_sqlite::SqliteStore;

  use super::*;

  #[derive(Debug)]
  struct Offline;

  impl std::fmt::Display for Offline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.write_str("mail provider offline")
    }
  }

  impl std::error::Error for Offline {}

  /// Accepts everything addressed to `example.com`, refuses the rest.
  struct DomainMailer;

  impl Mailer for DomainMailer {
    type Error = Offline;

    async fn send(&self, email: OutgoingEmail) -> Result<SendReceipt, Offline> {
      if email.to.ends_with("@example.com") {
        Ok(SendReceipt { message_id: format!("id-{}", email.to) })
      } else {
        Err(Offline)
      }
    }
  }

  async fn serve() -> ApiClient {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = ApiState::new(Arc::new(store), Arc::new(DomainMailer), DeliveryConfig::default());
    let app = axum::Router::new().nest("/api", api_router(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    ApiClient::new(format!("http://{addr}/")).unwrap()
  }

  #[tokio::test]
  async fn recipients_round_trip_through_server() {
    let client = serve().await;
    let r = client
      .add_recipient(&NewRecipient::new("Ann", "ann@example.com", "VIP"))
      .await
      .unwrap();

    let listed = client.list_recipients(Some("VIP")).await.unwrap();
    assert_eq!(listed, vec![r.clone()]);
    assert!(client.list_recipients(Some("Other")).await.unwrap().is_empty());

    client.delete_recipient(r.recipient_id).await.unwrap();
    assert!(client.list_recipients(None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn server_error_message_is_surfaced() {
    let client = serve().await;
    let err = client
      .add_recipient(&NewRecipient::new("Ann", "no-at-sign", "VIP"))
      .await
      .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("400"), "{text}");
    assert!(text.contains("email"), "{text}");
  }

  #[tokio::test]
  async fn campaign_lifecycle_and_test_run() {
    let client = serve().await;
    client
      .add_recipient(&NewRecipient::new("Ann", "ann@example.com", "VIP"))
      .await
      .unwrap();
    client
      .add_variant(&NewVariant {
        segment: "VIP".into(),
        subject_line: "Hello".into(),
        email_body: "Hi {{firstName}}".into(),
        ..Default::default()
      })
      .await
      .unwrap();

    let c = client
      .add_campaign(&NewCampaign {
        name:              "June".into(),
        segments:          vec![CampaignSegment::all_variants("VIP")],
        start_date:        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        end_date:          NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        assignment_method: AssignmentMethod::Random,
      })
      .await
      .unwrap();

    let active = client.set_status(c.campaign_id, CampaignStatus::Active).await.unwrap();
    assert_eq!(active.status, CampaignStatus::Active);

    let report = client.test_run(c.campaign_id).await.unwrap();
    assert_eq!(report.sent.len(), 1);
    assert_eq!(report.sent[0].message_id, "id-ann@example.com");

    let sends = client.list_sends(None, Some(c.campaign_id), None).await.unwrap();
    assert_eq!(sends.len(), 1);
  }

  #[tokio::test]
  async fn test_email_returns_message_id_or_fails() {
    let client = serve().await;
    let id = client
      .send_test_email("Ann", "ann@example.com", "Hi", "", "<p>Hi</p>")
      .await
      .unwrap();
    assert_eq!(id, "id-ann@example.com");

    let err = client
      .send_test_email("Bob", "bob@elsewhere.org", "Hi", "", "<p>Hi</p>")
      .await
      .unwrap_err();
    assert!(err.to_string().contains("Failed to send email"), "{err}");
  }
}
