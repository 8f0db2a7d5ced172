//! The send log, one row per delivered test email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSend {
  pub send_id:        Uuid,
  pub recipient_id:   Uuid,
  pub variant_id:     Uuid,
  /// The variant's key at send time; kept even if the variant is edited.
  pub variation_used: String,
  pub campaign_id:    Option<Uuid>,
  /// Identifier returned by the delivery provider.
  pub message_id:     Option<String>,
  pub sent_at:        DateTime<Utc>,
}

/// Input to [`crate::store::CampaignStore::record_send`]. `sent_at` is set by
/// the store.
#[derive(Debug, Clone)]
pub struct NewEmailSend {
  pub recipient_id:   Uuid,
  pub variant_id:     Uuid,
  pub variation_used: String,
  pub campaign_id:    Option<Uuid>,
  pub message_id:     Option<String>,
}

/// Parameters for [`crate::store::CampaignStore::list_sends`].
#[derive(Debug, Clone, Default)]
pub struct SendQuery {
  pub recipient_id: Option<Uuid>,
  pub campaign_id:  Option<Uuid>,
  /// Defaults to 100.
  pub limit:        Option<usize>,
}
