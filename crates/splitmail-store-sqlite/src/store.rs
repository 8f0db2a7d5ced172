//! [`SqliteStore`], the SQLite implementation of [`CampaignStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::debug;
use uuid::Uuid;

use splitmail_core::{
  campaign::{Campaign, CampaignStatus, NewCampaign},
  recipient::{NewRecipient, Recipient},
  segment::{NewSegment, Segment},
  send::{EmailSend, NewEmailSend, SendQuery},
  store::CampaignStore,
  variant::{MAX_VARIANTS_PER_SEGMENT, NewVariant, Variant, next_free_key},
};

use crate::{
  Error, Result,
  encode::{
    CAMPAIGN_COLUMNS, RECIPIENT_COLUMNS, RawCampaign, RawEmailSend, RawRecipient, RawSegment,
    RawVariant, SEGMENT_COLUMNS, SEND_COLUMNS, VARIANT_COLUMNS, encode_date, encode_dt,
    encode_segments, encode_uuid,
  },
  schema::SCHEMA,
};

const DEFAULT_SEND_LIMIT: usize = 100;

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn opt_text(s: Option<String>) -> Value { s.map_or(Value::Null, Value::Text) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Splitmail store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    debug!(path = %path.as_ref().display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Query helpers ─────────────────────────────────────────────────────────

  async fn fetch_all<R, F>(&self, sql: String, params: Vec<Value>, map: F) -> Result<Vec<R>>
  where
    R: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| map(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn fetch_one<R, F>(&self, sql: String, params: Vec<Value>, map: F) -> Result<Option<R>>
  where
    R: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), |row| map(row))
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  /// Run a write statement and return the number of affected rows.
  async fn execute(&self, sql: &'static str, params: Vec<Value>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params_from_iter(params))?))
      .await?;
    Ok(changed)
  }

  async fn find_segment_by_name(&self, name: &str) -> Result<Option<Segment>> {
    let raw = self
      .fetch_one(
        format!("SELECT {SEGMENT_COLUMNS} FROM segments WHERE name = ?1"),
        vec![text(name)],
        RawSegment::from_row,
      )
      .await?;
    raw.map(RawSegment::into_segment).transpose()
  }

  async fn variation_keys(&self, segment: &str) -> Result<Vec<(String, String)>> {
    self
      .fetch_all(
        "SELECT variant_id, variation_key FROM segment_variant_rules WHERE segment = ?1"
          .to_owned(),
        vec![text(segment)],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .await
  }
}

// ─── CampaignStore impl ──────────────────────────────────────────────────────

impl CampaignStore for SqliteStore {
  type Error = Error;

  // ── Recipients ────────────────────────────────────────────────────────────

  async fn add_recipient(&self, input: NewRecipient) -> Result<Recipient> {
    let input = input.validated()?;
    let recipient = Recipient {
      recipient_id: Uuid::new_v4(),
      first_name:   input.first_name,
      email:        input.email,
      segment:      input.segment,
      created_at:   Utc::now(),
    };

    self
      .execute(
        "INSERT INTO recipients (recipient_id, first_name, email, segment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        vec![
          text(encode_uuid(recipient.recipient_id)),
          text(recipient.first_name.clone()),
          text(recipient.email.clone()),
          text(recipient.segment.clone()),
          text(encode_dt(recipient.created_at)),
        ],
      )
      .await?;

    Ok(recipient)
  }

  async fn get_recipient(&self, id: Uuid) -> Result<Option<Recipient>> {
    let raw = self
      .fetch_one(
        format!("SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE recipient_id = ?1"),
        vec![text(encode_uuid(id))],
        RawRecipient::from_row,
      )
      .await?;
    raw.map(RawRecipient::into_recipient).transpose()
  }

  async fn list_recipients(&self) -> Result<Vec<Recipient>> {
    let raws = self
      .fetch_all(
        format!(
          "SELECT {RECIPIENT_COLUMNS} FROM recipients
           ORDER BY first_name COLLATE NOCASE, rowid"
        ),
        vec![],
        RawRecipient::from_row,
      )
      .await?;
    raws.into_iter().map(RawRecipient::into_recipient).collect()
  }

  async fn recipients_in_segment(&self, segment: &str) -> Result<Vec<Recipient>> {
    let raws = self
      .fetch_all(
        format!(
          "SELECT {RECIPIENT_COLUMNS} FROM recipients
           WHERE segment = ?1
           ORDER BY first_name COLLATE NOCASE, rowid"
        ),
        vec![text(segment)],
        RawRecipient::from_row,
      )
      .await?;
    raws.into_iter().map(RawRecipient::into_recipient).collect()
  }

  async fn update_recipient(&self, id: Uuid, input: NewRecipient) -> Result<Recipient> {
    let input = input.validated()?;
    let existing = self
      .get_recipient(id)
      .await?
      .ok_or(splitmail_core::Error::RecipientNotFound(id))?;

    self
      .execute(
        "UPDATE recipients SET first_name = ?2, email = ?3, segment = ?4
         WHERE recipient_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(input.first_name.clone()),
          text(input.email.clone()),
          text(input.segment.clone()),
        ],
      )
      .await?;

    Ok(Recipient {
      first_name: input.first_name,
      email: input.email,
      segment: input.segment,
      ..existing
    })
  }

  async fn delete_recipient(&self, id: Uuid) -> Result<()> {
    let changed = self
      .execute("DELETE FROM recipients WHERE recipient_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    if changed == 0 {
      return Err(splitmail_core::Error::RecipientNotFound(id).into());
    }
    Ok(())
  }

  // ── Segments ──────────────────────────────────────────────────────────────

  async fn add_segment(&self, input: NewSegment) -> Result<Segment> {
    let input = input.validated()?;
    if self.find_segment_by_name(&input.name).await?.is_some() {
      return Err(splitmail_core::Error::DuplicateSegment(input.name).into());
    }

    let segment = Segment {
      segment_id:  Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      created_at:  Utc::now(),
    };

    self
      .execute(
        "INSERT INTO segments (segment_id, name, description, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        vec![
          text(encode_uuid(segment.segment_id)),
          text(segment.name.clone()),
          opt_text(segment.description.clone()),
          text(encode_dt(segment.created_at)),
        ],
      )
      .await?;

    Ok(segment)
  }

  async fn get_segment(&self, id: Uuid) -> Result<Option<Segment>> {
    let raw = self
      .fetch_one(
        format!("SELECT {SEGMENT_COLUMNS} FROM segments WHERE segment_id = ?1"),
        vec![text(encode_uuid(id))],
        RawSegment::from_row,
      )
      .await?;
    raw.map(RawSegment::into_segment).transpose()
  }

  async fn list_segments(&self) -> Result<Vec<Segment>> {
    let raws = self
      .fetch_all(
        format!("SELECT {SEGMENT_COLUMNS} FROM segments ORDER BY created_at DESC, rowid DESC"),
        vec![],
        RawSegment::from_row,
      )
      .await?;
    raws.into_iter().map(RawSegment::into_segment).collect()
  }

  async fn update_segment(&self, id: Uuid, input: NewSegment) -> Result<Segment> {
    let input = input.validated()?;
    let existing = self
      .get_segment(id)
      .await?
      .ok_or(splitmail_core::Error::SegmentNotFound(id))?;

    let taken = self
      .find_segment_by_name(&input.name)
      .await?
      .is_some_and(|other| other.segment_id != id);
    if taken {
      return Err(splitmail_core::Error::DuplicateSegment(input.name).into());
    }

    self
      .execute(
        "UPDATE segments SET name = ?2, description = ?3 WHERE segment_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(input.name.clone()),
          opt_text(input.description.clone()),
        ],
      )
      .await?;

    Ok(Segment { name: input.name, description: input.description, ..existing })
  }

  async fn delete_segment(&self, id: Uuid) -> Result<()> {
    let segment = self
      .get_segment(id)
      .await?
      .ok_or(splitmail_core::Error::SegmentNotFound(id))?;

    let recipients = self.count_recipients_in_segment(&segment.name).await?;
    if recipients > 0 {
      return Err(
        splitmail_core::Error::SegmentInUse { name: segment.name, recipients }.into(),
      );
    }

    self
      .execute("DELETE FROM segments WHERE segment_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    Ok(())
  }

  async fn count_recipients_in_segment(&self, segment: &str) -> Result<u64> {
    let count: i64 = self
      .fetch_one(
        "SELECT COUNT(*) FROM recipients WHERE segment = ?1".to_owned(),
        vec![text(segment)],
        |row| row.get(0),
      )
      .await?
      .unwrap_or(0);
    Ok(count.max(0) as u64)
  }

  async fn list_segment_labels(&self) -> Result<Vec<String>> {
    self
      .fetch_all(
        "SELECT name FROM segments
         UNION
         SELECT segment FROM recipients WHERE segment <> ''
         ORDER BY 1"
          .to_owned(),
        vec![],
        |row| row.get(0),
      )
      .await
  }

  // ── Variants ──────────────────────────────────────────────────────────────

  async fn add_variant(&self, input: NewVariant) -> Result<Variant> {
    let input = input.validated()?;
    let taken: Vec<String> = self
      .variation_keys(&input.segment)
      .await?
      .into_iter()
      .map(|(_, key)| key)
      .collect();

    let limit = || splitmail_core::Error::VariantLimit {
      segment: input.segment.clone(),
      max:     MAX_VARIANTS_PER_SEGMENT,
    };
    if taken.len() >= MAX_VARIANTS_PER_SEGMENT {
      return Err(limit().into());
    }

    let variation_key = match input.variation_key.clone() {
      Some(key) if taken.contains(&key) => {
        return Err(
          splitmail_core::Error::DuplicateVariationKey { segment: input.segment.clone(), key }
            .into(),
        );
      }
      Some(key) => key,
      None => next_free_key(&taken).ok_or_else(limit)?.to_owned(),
    };

    let variant = Variant {
      variant_id: Uuid::new_v4(),
      segment: input.segment,
      variation_key,
      subject_line: input.subject_line,
      headline: input.headline,
      email_body: input.email_body,
      call_to_action: input.call_to_action,
      image_url: input.image_url,
      created_at: Utc::now(),
    };

    self
      .execute(
        "INSERT INTO segment_variant_rules (
           variant_id, segment, variation_key, subject_line, headline,
           email_body, call_to_action, image_url, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        vec![
          text(encode_uuid(variant.variant_id)),
          text(variant.segment.clone()),
          text(variant.variation_key.clone()),
          text(variant.subject_line.clone()),
          text(variant.headline.clone()),
          text(variant.email_body.clone()),
          text(variant.call_to_action.clone()),
          text(variant.image_url.clone()),
          text(encode_dt(variant.created_at)),
        ],
      )
      .await?;

    Ok(variant)
  }

  async fn get_variant(&self, id: Uuid) -> Result<Option<Variant>> {
    let raw = self
      .fetch_one(
        format!("SELECT {VARIANT_COLUMNS} FROM segment_variant_rules WHERE variant_id = ?1"),
        vec![text(encode_uuid(id))],
        RawVariant::from_row,
      )
      .await?;
    raw.map(RawVariant::into_variant).transpose()
  }

  async fn list_variants(&self, segment: Option<String>) -> Result<Vec<Variant>> {
    let (sql, params) = match segment {
      Some(s) => (
        format!(
          "SELECT {VARIANT_COLUMNS} FROM segment_variant_rules
           WHERE segment = ?1 ORDER BY variation_key"
        ),
        vec![text(s)],
      ),
      None => (
        format!(
          "SELECT {VARIANT_COLUMNS} FROM segment_variant_rules
           ORDER BY segment, variation_key"
        ),
        vec![],
      ),
    };
    let raws = self.fetch_all(sql, params, RawVariant::from_row).await?;
    raws.into_iter().map(RawVariant::into_variant).collect()
  }

  async fn update_variant(&self, id: Uuid, input: NewVariant) -> Result<Variant> {
    let input = input.validated()?;
    let existing = self
      .get_variant(id)
      .await?
      .ok_or(splitmail_core::Error::VariantNotFound(id))?;

    let variation_key = input
      .variation_key
      .clone()
      .unwrap_or_else(|| existing.variation_key.clone());

    if input.segment != existing.segment || variation_key != existing.variation_key {
      let others: Vec<(String, String)> = self
        .variation_keys(&input.segment)
        .await?
        .into_iter()
        .filter(|(other_id, _)| *other_id != encode_uuid(id))
        .collect();
      if others.iter().any(|(_, key)| *key == variation_key) {
        return Err(
          splitmail_core::Error::DuplicateVariationKey { segment: input.segment, key: variation_key }
            .into(),
        );
      }
      if others.len() >= MAX_VARIANTS_PER_SEGMENT {
        return Err(
          splitmail_core::Error::VariantLimit {
            segment: input.segment,
            max:     MAX_VARIANTS_PER_SEGMENT,
          }
          .into(),
        );
      }
    }

    let variant = Variant {
      variant_id: id,
      segment: input.segment,
      variation_key,
      subject_line: input.subject_line,
      headline: input.headline,
      email_body: input.email_body,
      call_to_action: input.call_to_action,
      image_url: input.image_url,
      created_at: existing.created_at,
    };

    self
      .execute(
        "UPDATE segment_variant_rules SET
           segment = ?2, variation_key = ?3, subject_line = ?4, headline = ?5,
           email_body = ?6, call_to_action = ?7, image_url = ?8
         WHERE variant_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(variant.segment.clone()),
          text(variant.variation_key.clone()),
          text(variant.subject_line.clone()),
          text(variant.headline.clone()),
          text(variant.email_body.clone()),
          text(variant.call_to_action.clone()),
          text(variant.image_url.clone()),
        ],
      )
      .await?;

    Ok(variant)
  }

  async fn delete_variant(&self, id: Uuid) -> Result<()> {
    if self.get_variant(id).await?.is_none() {
      return Err(splitmail_core::Error::VariantNotFound(id).into());
    }

    if let Some(campaign) = self
      .list_campaigns()
      .await?
      .into_iter()
      .find(|c| c.references_variant(id))
    {
      return Err(
        splitmail_core::Error::VariantInUse { variant_id: id, campaign: campaign.name }.into(),
      );
    }

    self
      .execute(
        "DELETE FROM segment_variant_rules WHERE variant_id = ?1",
        vec![text(encode_uuid(id))],
      )
      .await?;
    Ok(())
  }

  // ── Campaigns ─────────────────────────────────────────────────────────────

  async fn add_campaign(&self, input: NewCampaign) -> Result<Campaign> {
    let input = input.validated()?;
    let campaign = Campaign {
      campaign_id:       Uuid::new_v4(),
      name:              input.name,
      segments:          input.segments,
      start_date:        input.start_date,
      end_date:          input.end_date,
      assignment_method: input.assignment_method,
      status:            CampaignStatus::Draft,
      created_at:        Utc::now(),
    };

    self
      .execute(
        "INSERT INTO campaigns (
           campaign_id, name, segments_json, start_date, end_date,
           assignment_method, status, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        vec![
          text(encode_uuid(campaign.campaign_id)),
          text(campaign.name.clone()),
          text(encode_segments(&campaign.segments)?),
          text(encode_date(campaign.start_date)),
          text(encode_date(campaign.end_date)),
          text(campaign.assignment_method.as_str()),
          text(campaign.status.as_str()),
          text(encode_dt(campaign.created_at)),
        ],
      )
      .await?;

    Ok(campaign)
  }

  async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
    let raw = self
      .fetch_one(
        format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE campaign_id = ?1"),
        vec![text(encode_uuid(id))],
        RawCampaign::from_row,
      )
      .await?;
    raw.map(RawCampaign::into_campaign).transpose()
  }

  async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
    let raws = self
      .fetch_all(
        format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at, rowid"),
        vec![],
        RawCampaign::from_row,
      )
      .await?;
    raws.into_iter().map(RawCampaign::into_campaign).collect()
  }

  async fn update_campaign(&self, id: Uuid, input: NewCampaign) -> Result<Campaign> {
    let input = input.validated()?;
    let existing = self
      .get_campaign(id)
      .await?
      .ok_or(splitmail_core::Error::CampaignNotFound(id))?;

    self
      .execute(
        "UPDATE campaigns SET
           name = ?2, segments_json = ?3, start_date = ?4, end_date = ?5,
           assignment_method = ?6
         WHERE campaign_id = ?1",
        vec![
          text(encode_uuid(id)),
          text(input.name.clone()),
          text(encode_segments(&input.segments)?),
          text(encode_date(input.start_date)),
          text(encode_date(input.end_date)),
          text(input.assignment_method.as_str()),
        ],
      )
      .await?;

    Ok(Campaign {
      name: input.name,
      segments: input.segments,
      start_date: input.start_date,
      end_date: input.end_date,
      assignment_method: input.assignment_method,
      ..existing
    })
  }

  async fn set_campaign_status(&self, id: Uuid, status: CampaignStatus) -> Result<Campaign> {
    let existing = self
      .get_campaign(id)
      .await?
      .ok_or(splitmail_core::Error::CampaignNotFound(id))?;
    let status = existing.status.transition(status)?;

    self
      .execute(
        "UPDATE campaigns SET status = ?2 WHERE campaign_id = ?1",
        vec![text(encode_uuid(id)), text(status.as_str())],
      )
      .await?;

    Ok(Campaign { status, ..existing })
  }

  async fn delete_campaign(&self, id: Uuid) -> Result<()> {
    let changed = self
      .execute("DELETE FROM campaigns WHERE campaign_id = ?1", vec![text(encode_uuid(id))])
      .await?;
    if changed == 0 {
      return Err(splitmail_core::Error::CampaignNotFound(id).into());
    }
    Ok(())
  }

  // ── Send log ──────────────────────────────────────────────────────────────

  async fn record_send(&self, input: NewEmailSend) -> Result<EmailSend> {
    let send = EmailSend {
      send_id:        Uuid::new_v4(),
      recipient_id:   input.recipient_id,
      variant_id:     input.variant_id,
      variation_used: input.variation_used,
      campaign_id:    input.campaign_id,
      message_id:     input.message_id,
      sent_at:        Utc::now(),
    };

    self
      .execute(
        "INSERT INTO email_sends (
           send_id, recipient_id, variant_id, variation_used,
           campaign_id, message_id, sent_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        vec![
          text(encode_uuid(send.send_id)),
          text(encode_uuid(send.recipient_id)),
          text(encode_uuid(send.variant_id)),
          text(send.variation_used.clone()),
          opt_text(send.campaign_id.map(encode_uuid)),
          opt_text(send.message_id.clone()),
          text(encode_dt(send.sent_at)),
        ],
      )
      .await?;

    Ok(send)
  }

  async fn list_sends(&self, query: &SendQuery) -> Result<Vec<EmailSend>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];
    if let Some(id) = query.recipient_id {
      conds.push("recipient_id = ?");
      params.push(text(encode_uuid(id)));
    }
    if let Some(id) = query.campaign_id {
      conds.push("campaign_id = ?");
      params.push(text(encode_uuid(id)));
    }
    let limit = query.limit.unwrap_or(DEFAULT_SEND_LIMIT);
    params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let raws = self
      .fetch_all(
        format!(
          "SELECT {SEND_COLUMNS} FROM email_sends
           {where_clause}
           ORDER BY sent_at DESC, rowid DESC
           LIMIT ?"
        ),
        params,
        RawEmailSend::from_row,
      )
      .await?;
    raws.into_iter().map(RawEmailSend::into_send).collect()
  }
}
