//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs
//! are hyphenated lowercase strings and campaign segment entries are compact
//! JSON.

use chrono::{DateTime, NaiveDate, Utc};
use splitmail_core::{
  campaign::{AssignmentMethod, Campaign, CampaignSegment, CampaignStatus},
  recipient::Recipient,
  segment::Segment,
  send::EmailSend,
  variant::Variant,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_status(s: &str) -> Result<CampaignStatus> {
  CampaignStatus::parse(s).ok_or_else(|| Error::UnknownValue {
    column: "status",
    value:  s.to_owned(),
  })
}

pub fn decode_method(s: &str) -> Result<AssignmentMethod> {
  AssignmentMethod::parse(s).ok_or_else(|| Error::UnknownValue {
    column: "assignment_method",
    value:  s.to_owned(),
  })
}

pub fn encode_segments(segments: &[CampaignSegment]) -> Result<String> {
  Ok(serde_json::to_string(segments)?)
}

pub fn decode_segments(s: &str) -> Result<Vec<CampaignSegment>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const RECIPIENT_COLUMNS: &str = "recipient_id, first_name, email, segment, created_at";

pub struct RawRecipient {
  pub recipient_id: String,
  pub first_name:   String,
  pub email:        String,
  pub segment:      String,
  pub created_at:   String,
}

impl RawRecipient {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      recipient_id: row.get(0)?,
      first_name:   row.get(1)?,
      email:        row.get(2)?,
      segment:      row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_recipient(self) -> Result<Recipient> {
    Ok(Recipient {
      recipient_id: decode_uuid(&self.recipient_id)?,
      first_name:   self.first_name,
      email:        self.email,
      segment:      self.segment,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const SEGMENT_COLUMNS: &str = "segment_id, name, description, created_at";

pub struct RawSegment {
  pub segment_id:  String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawSegment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      segment_id:  row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_segment(self) -> Result<Segment> {
    Ok(Segment {
      segment_id:  decode_uuid(&self.segment_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const VARIANT_COLUMNS: &str = "variant_id, segment, variation_key, subject_line, headline, \
                                   email_body, call_to_action, image_url, created_at";

pub struct RawVariant {
  pub variant_id:     String,
  pub segment:        String,
  pub variation_key:  String,
  pub subject_line:   String,
  pub headline:       String,
  pub email_body:     String,
  pub call_to_action: String,
  pub image_url:      String,
  pub created_at:     String,
}

impl RawVariant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      variant_id:     row.get(0)?,
      segment:        row.get(1)?,
      variation_key:  row.get(2)?,
      subject_line:   row.get(3)?,
      headline:       row.get(4)?,
      email_body:     row.get(5)?,
      call_to_action: row.get(6)?,
      image_url:      row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_variant(self) -> Result<Variant> {
    Ok(Variant {
      variant_id:     decode_uuid(&self.variant_id)?,
      segment:        self.segment,
      variation_key:  self.variation_key,
      subject_line:   self.subject_line,
      headline:       self.headline,
      email_body:     self.email_body,
      call_to_action: self.call_to_action,
      image_url:      self.image_url,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const CAMPAIGN_COLUMNS: &str = "campaign_id, name, segments_json, start_date, end_date, \
                                    assignment_method, status, created_at";

pub struct RawCampaign {
  pub campaign_id:       String,
  pub name:              String,
  pub segments_json:     String,
  pub start_date:        String,
  pub end_date:          String,
  pub assignment_method: String,
  pub status:            String,
  pub created_at:        String,
}

impl RawCampaign {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      campaign_id:       row.get(0)?,
      name:              row.get(1)?,
      segments_json:     row.get(2)?,
      start_date:        row.get(3)?,
      end_date:          row.get(4)?,
      assignment_method: row.get(5)?,
      status:            row.get(6)?,
      created_at:        row.get(7)?,
    })
  }

  pub fn into_campaign(self) -> Result<Campaign> {
    Ok(Campaign {
      campaign_id:       decode_uuid(&self.campaign_id)?,
      name:              self.name,
      segments:          decode_segments(&self.segments_json)?,
      start_date:        decode_date(&self.start_date)?,
      end_date:          decode_date(&self.end_date)?,
      assignment_method: decode_method(&self.assignment_method)?,
      status:            decode_status(&self.status)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

pub const SEND_COLUMNS: &str =
  "send_id, recipient_id, variant_id, variation_used, campaign_id, message_id, sent_at";

pub struct RawEmailSend {
  pub send_id:        String,
  pub recipient_id:   String,
  pub variant_id:     String,
  pub variation_used: String,
  pub campaign_id:    Option<String>,
  pub message_id:     Option<String>,
  pub sent_at:        String,
}

impl RawEmailSend {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      send_id:        row.get(0)?,
      recipient_id:   row.get(1)?,
      variant_id:     row.get(2)?,
      variation_used: row.get(3)?,
      campaign_id:    row.get(4)?,
      message_id:     row.get(5)?,
      sent_at:        row.get(6)?,
    })
  }

  pub fn into_send(self) -> Result<EmailSend> {
    Ok(EmailSend {
      send_id:        decode_uuid(&self.send_id)?,
      recipient_id:   decode_uuid(&self.recipient_id)?,
      variant_id:     decode_uuid(&self.variant_id)?,
      variation_used: self.variation_used,
      campaign_id:    self.campaign_id.as_deref().map(decode_uuid).transpose()?,
      message_id:     self.message_id,
      sent_at:        decode_dt(&self.sent_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_round_trip_as_iso() {
    let d = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    assert_eq!(encode_date(d), "2024-03-31");
    assert_eq!(decode_date("2024-03-31").unwrap(), d);
  }

  #[test]
  fn legacy_inactive_status_decodes_as_paused() {
    assert_eq!(decode_status("inactive").unwrap(), CampaignStatus::Paused);
    assert!(matches!(
      decode_status("archived"),
      Err(Error::UnknownValue { column: "status", .. })
    ));
  }
}
