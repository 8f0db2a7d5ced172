//! The campaign test run: one email per eligible recipient, each with a
//! randomly drawn variant.
//!
//! Sends are strictly sequential (segment entries in campaign order, then
//! recipients in store order) and each delivery call is awaited before the
//! next one starts. The first delivery failure ends the run; emails already
//! sent stay sent.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  assign::{candidates, pick_variant},
  campaign::{AssignmentMethod, Campaign},
  delivery::{DeliveryConfig, Mailer},
  render::compose,
  send::NewEmailSend,
  store::CampaignStore,
};

// ─── Report ──────────────────────────────────────────────────────────────────

/// One delivered email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmail {
  pub recipient_id:  Uuid,
  pub email:         String,
  pub segment:       String,
  pub variant_id:    Uuid,
  pub variation_key: String,
  pub message_id:    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  NoRecipients,
  NoVariants,
}

/// A campaign segment entry that produced no sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSegment {
  pub segment: String,
  pub reason:  SkipReason,
}

/// Outcome of a completed test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunReport {
  pub campaign_id:   Uuid,
  pub campaign_name: String,
  pub sent:          Vec<SentEmail>,
  pub skipped:       Vec<SkippedSegment>,
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TestRunError<S, M>
where
  S: std::error::Error + 'static,
  M: std::error::Error + 'static,
{
  #[error("store error: {0}")]
  Store(#[source] S),

  #[error("failed to send email to {recipient}")]
  Delivery {
    recipient: String,
    #[source]
    source:    M,
  },
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Run `campaign` once against every recipient of its segments.
///
/// Segment entries with no recipients or no candidate variants are skipped
/// and listed in [`TestRunReport::skipped`]. When
/// [`DeliveryConfig::record_sends`] is set, each successful send appends a
/// send-log row before the next recipient is processed.
pub async fn run_test<S, M>(
  store: &S,
  mailer: &M,
  campaign: &Campaign,
  delivery: &DeliveryConfig,
) -> Result<TestRunReport, TestRunError<S::Error, M::Error>>
where
  S: CampaignStore,
  M: Mailer,
{
  if campaign.assignment_method != AssignmentMethod::Random {
    warn!(
      campaign = %campaign.name,
      method = campaign.assignment_method.as_str(),
      "assignment method not implemented, drawing at random"
    );
  }

  info!(campaign = %campaign.name, segments = campaign.segments.len(), "starting test run");

  let mut report = TestRunReport {
    campaign_id:   campaign.campaign_id,
    campaign_name: campaign.name.clone(),
    sent:          Vec::new(),
    skipped:       Vec::new(),
  };

  for entry in &campaign.segments {
    let recipients = store
      .recipients_in_segment(&entry.segment)
      .await
      .map_err(TestRunError::Store)?;
    if recipients.is_empty() {
      debug!(segment = %entry.segment, "no recipients, skipping segment");
      report.skipped.push(SkippedSegment {
        segment: entry.segment.clone(),
        reason:  SkipReason::NoRecipients,
      });
      continue;
    }

    let segment_variants = store
      .list_variants(Some(entry.segment.clone()))
      .await
      .map_err(TestRunError::Store)?;
    let pool = candidates(entry, segment_variants);
    if pool.is_empty() {
      debug!(segment = %entry.segment, "no candidate variants, skipping segment");
      report.skipped.push(SkippedSegment {
        segment: entry.segment.clone(),
        reason:  SkipReason::NoVariants,
      });
      continue;
    }

    for recipient in &recipients {
      let picked = {
        let mut rng = rand::thread_rng();
        pick_variant(&pool, &mut rng)
      };
      let Some(variant) = picked else { continue };

      let email = compose(&delivery.from, recipient.into(), variant.into());
      let receipt = match mailer.send(email).await {
        Ok(receipt) => receipt,
        Err(source) => {
          warn!(
            campaign = %campaign.name,
            recipient = %recipient.email,
            error = %source,
            sent = report.sent.len(),
            "delivery failed, aborting test run"
          );
          return Err(TestRunError::Delivery {
            recipient: recipient.email.clone(),
            source,
          });
        }
      };

      debug!(
        recipient = %recipient.email,
        variant = %variant.variation_key,
        message_id = %receipt.message_id,
        "test email sent"
      );

      if delivery.record_sends {
        store
          .record_send(NewEmailSend {
            recipient_id:   recipient.recipient_id,
            variant_id:     variant.variant_id,
            variation_used: variant.variation_key.clone(),
            campaign_id:    Some(campaign.campaign_id),
            message_id:     Some(receipt.message_id.clone()),
          })
          .await
          .map_err(TestRunError::Store)?;
      }

      report.sent.push(SentEmail {
        recipient_id:  recipient.recipient_id,
        email:         recipient.email.clone(),
        segment:       entry.segment.clone(),
        variant_id:    variant.variant_id,
        variation_key: variant.variation_key.clone(),
        message_id:    receipt.message_id,
      });
    }
  }

  info!(
    campaign = %campaign.name,
    sent = report.sent.len(),
    skipped = report.skipped.len(),
    "test run complete"
  );
  Ok(report)
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  };

  use chrono::{NaiveDate, Utc};

  use super::*;
  use crate::{
    Error,
    campaign::{CampaignSegment, CampaignStatus, NewCampaign},
    delivery::{OutgoingEmail, SendReceipt},
    recipient::{NewRecipient, Recipient},
    segment::{NewSegment, Segment},
    send::{EmailSend, SendQuery},
    variant::{NewVariant, Variant},
  };

  // A store holding just what the engine reads and writes.
  #[derive(Default)]
  struct MemStore {
    recipients: Vec<Recipient>,
    variants:   Vec<Variant>,
    sends:      Mutex<Vec<NewEmailSend>>,
  }

  impl CampaignStore for MemStore {
    type Error = Error;

    async fn add_recipient(&self, _: NewRecipient) -> Result<Recipient, Error> { unimplemented!() }
    async fn get_recipient(&self, _: Uuid) -> Result<Option<Recipient>, Error> { unimplemented!() }
    async fn list_recipients(&self) -> Result<Vec<Recipient>, Error> { unimplemented!() }
    async fn recipients_in_segment(&self, segment: &str) -> Result<Vec<Recipient>, Error> {
      Ok(self.recipients.iter().filter(|r| r.segment == segment).cloned().collect())
    }
    async fn update_recipient(&self, _: Uuid, _: NewRecipient) -> Result<Recipient, Error> { unimplemented!() }
    async fn delete_recipient(&self, _: Uuid) -> Result<(), Error> { unimplemented!() }
    async fn add_segment(&self, _: NewSegment) -> Result<Segment, Error> { unimplemented!() }
    async fn get_segment(&self, _: Uuid) -> Result<Option<Segment>, Error> { unimplemented!() }
    async fn list_segments(&self) -> Result<Vec<Segment>, Error> { unimplemented!() }
    async fn update_segment(&self, _: Uuid, _: NewSegment) -> Result<Segment, Error> { unimplemented!() }
    async fn delete_segment(&self, _: Uuid) -> Result<(), Error> { unimplemented!() }
    async fn count_recipients_in_segment(&self, _: &str) -> Result<u64, Error> { unimplemented!() }
    async fn list_segment_labels(&self) -> Result<Vec<String>, Error> { unimplemented!() }
    async fn add_variant(&self, _: NewVariant) -> Result<Variant, Error> { unimplemented!() }
    async fn get_variant(&self, _: Uuid) -> Result<Option<Variant>, Error> { unimplemented!() }
    async fn list_variants(&self, segment: Option<String>) -> Result<Vec<Variant>, Error> {
      Ok(
        self
          .variants
          .iter()
          .filter(|v| segment.as_deref().is_none_or(|s| v.segment == s))
          .cloned()
          .collect(),
      )
    }
    async fn update_variant(&self, _: Uuid, _: NewVariant) -> Result<Variant, Error> { unimplemented!() }
    async fn delete_variant(&self, _: Uuid) -> Result<(), Error> { unimplemented!() }
    async fn add_campaign(&self, _: NewCampaign) -> Result<Campaign, Error> { unimplemented!() }
    async fn get_campaign(&self, _: Uuid) -> Result<Option<Campaign>, Error> { unimplemented!() }
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, Error> { unimplemented!() }
    async fn update_campaign(&self, _: Uuid, _: NewCampaign) -> Result<Campaign, Error> { unimplemented!() }
    async fn set_campaign_status(&self, _: Uuid, _: CampaignStatus) -> Result<Campaign, Error> { unimplemented!() }
    async fn delete_campaign(&self, _: Uuid) -> Result<(), Error> { unimplemented!() }
    async fn record_send(&self, input: NewEmailSend) -> Result<EmailSend, Error> {
      let send = EmailSend {
        send_id:        Uuid::new_v4(),
        recipient_id:   input.recipient_id,
        variant_id:     input.variant_id,
        variation_used: input.variation_used.clone(),
        campaign_id:    input.campaign_id,
        message_id:     input.message_id.clone(),
        sent_at:        Utc::now(),
      };
      self.sends.lock().unwrap().push(input);
      Ok(send)
    }
    async fn list_sends(&self, _: &SendQuery) -> Result<Vec<EmailSend>, Error> { unimplemented!() }
  }

  #[derive(Debug, thiserror::Error)]
  #[error("provider unavailable")]
  struct Unavailable;

  /// Records every message; fails the call with index `fail_at`, if set.
  #[derive(Default)]
  struct FakeMailer {
    sent:    Mutex<Vec<OutgoingEmail>>,
    calls:   AtomicUsize,
    fail_at: Option<usize>,
  }

  impl Mailer for FakeMailer {
    type Error = Unavailable;

    async fn send(&self, email: OutgoingEmail) -> Result<SendReceipt, Unavailable> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_at == Some(n) {
        return Err(Unavailable);
      }
      self.sent.lock().unwrap().push(email);
      Ok(SendReceipt { message_id: format!("msg-{n}") })
    }
  }

  fn recipient(name: &str, segment: &str) -> Recipient {
    Recipient {
      recipient_id: Uuid::new_v4(),
      first_name:   name.into(),
      email:        format!("{}@example.com", name.to_lowercase()),
      segment:      segment.into(),
      created_at:   Utc::now(),
    }
  }

  fn variant(segment: &str, key: &str) -> Variant {
    Variant {
      variant_id:     Uuid::new_v4(),
      segment:        segment.into(),
      variation_key:  key.into(),
      subject_line:   format!("{segment} {key}"),
      headline:       format!("Headline {key}"),
      email_body:     "Dear {{firstName}}, {{headline}}".into(),
      call_to_action: String::new(),
      image_url:      String::new(),
      created_at:     Utc::now(),
    }
  }

  fn campaign(segments: Vec<CampaignSegment>) -> Campaign {
    Campaign {
      campaign_id:       Uuid::new_v4(),
      name:              "Q1".into(),
      segments,
      start_date:        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
      end_date:          NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
      assignment_method: AssignmentMethod::Random,
      status:            CampaignStatus::Active,
      created_at:        Utc::now(),
    }
  }

  #[tokio::test]
  async fn sends_one_email_per_recipient_in_order() {
    let store = MemStore {
      recipients: vec![
        recipient("Ann", "high"),
        recipient("Bob", "budget"),
        recipient("Cy", "high"),
      ],
      variants: vec![variant("high", "A"), variant("high", "B"), variant("budget", "A")],
      ..Default::default()
    };
    let mailer = FakeMailer::default();
    let c = campaign(vec![
      CampaignSegment::all_variants("high"),
      CampaignSegment::all_variants("budget"),
    ]);

    let report = run_test(&store, &mailer, &c, &DeliveryConfig::default()).await.unwrap();

    let to: Vec<_> = mailer.sent.lock().unwrap().iter().map(|e| e.to.clone()).collect();
    assert_eq!(to, ["ann@example.com", "cy@example.com", "bob@example.com"]);
    assert_eq!(report.sent.len(), 3);
    assert!(report.skipped.is_empty());
    for sent in &report.sent {
      let v = store.variants.iter().find(|v| v.variant_id == sent.variant_id).unwrap();
      assert_eq!(v.segment, sent.segment);
    }
    assert_eq!(store.sends.lock().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn bodies_are_personalised() {
    let store = MemStore {
      recipients: vec![recipient("Ann", "high")],
      variants: vec![variant("high", "A")],
      ..Default::default()
    };
    let mailer = FakeMailer::default();
    let c = campaign(vec![CampaignSegment::all_variants("high")]);
    run_test(&store, &mailer, &c, &DeliveryConfig::default()).await.unwrap();

    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent[0].html, "Dear Ann, Headline A");
    assert_eq!(sent[0].subject, "high A");
  }

  #[tokio::test]
  async fn empty_segments_are_skipped() {
    let store = MemStore {
      recipients: vec![recipient("Ann", "high"), recipient("Bob", "novariants")],
      variants: vec![variant("high", "A")],
      ..Default::default()
    };
    let mailer = FakeMailer::default();
    let c = campaign(vec![
      CampaignSegment::all_variants("empty"),
      CampaignSegment::all_variants("novariants"),
      CampaignSegment::all_variants("high"),
    ]);

    let report = run_test(&store, &mailer, &c, &DeliveryConfig::default()).await.unwrap();
    assert_eq!(report.sent.len(), 1);
    assert_eq!(
      report.skipped,
      vec![
        SkippedSegment { segment: "empty".into(), reason: SkipReason::NoRecipients },
        SkippedSegment { segment: "novariants".into(), reason: SkipReason::NoVariants },
      ]
    );
  }

  #[tokio::test]
  async fn subset_limits_the_draw() {
    let a = variant("high", "A");
    let b = variant("high", "B");
    let store = MemStore {
      recipients: (0..20).map(|i| recipient(&format!("R{i}"), "high")).collect(),
      variants: vec![a.clone(), b],
      ..Default::default()
    };
    let mailer = FakeMailer::default();
    let c = campaign(vec![CampaignSegment { segment: "high".into(), variants: vec![a.variant_id] }]);

    let report = run_test(&store, &mailer, &c, &DeliveryConfig::default()).await.unwrap();
    assert_eq!(report.sent.len(), 20);
    assert!(report.sent.iter().all(|s| s.variant_id == a.variant_id));
  }

  #[tokio::test]
  async fn delivery_failure_stops_the_run() {
    let store = MemStore {
      recipients: vec![recipient("Ann", "high"), recipient("Bob", "high"), recipient("Cy", "high")],
      variants: vec![variant("high", "A")],
      ..Default::default()
    };
    let mailer = FakeMailer { fail_at: Some(1), ..Default::default() };
    let c = campaign(vec![CampaignSegment::all_variants("high")]);

    let err = run_test(&store, &mailer, &c, &DeliveryConfig::default()).await.unwrap_err();
    match err {
      TestRunError::Delivery { recipient, .. } => assert_eq!(recipient, "bob@example.com"),
      other => panic!("expected delivery error, got {other:?}"),
    }
    assert_eq!(mailer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    assert_eq!(store.sends.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn send_log_can_be_disabled() {
    let store = MemStore {
      recipients: vec![recipient("Ann", "high")],
      variants: vec![variant("high", "A")],
      ..Default::default()
    };
    let mailer = FakeMailer::default();
    let c = campaign(vec![CampaignSegment::all_variants("high")]);
    let delivery = DeliveryConfig { record_sends: false, ..Default::default() };

    let report = run_test(&store, &mailer, &c, &delivery).await.unwrap();
    assert_eq!(report.sent.len(), 1);
    assert!(store.sends.lock().unwrap().is_empty());
  }
}
