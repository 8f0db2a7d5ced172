//! The `CampaignStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `splitmail-store-sqlite`). Higher layers (`splitmail-api`, the test-run
//! engine) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  StoreError,
  campaign::{Campaign, CampaignStatus, NewCampaign},
  recipient::{NewRecipient, Recipient},
  segment::{NewSegment, Segment},
  send::{EmailSend, NewEmailSend, SendQuery},
  variant::{NewVariant, Variant},
};

/// Abstraction over a Splitmail store backend.
///
/// Every mutation is a plain row write: creates are preceded by a
/// lookup-then-insert uniqueness check, updates replace the whole row,
/// deletes never cascade. Nothing is wrapped in a transaction, so two
/// writers racing on the same row resolve as last-write-wins.
///
/// Update and delete of a missing row fail with the entity's `*NotFound`
/// domain error (see [`StoreError::domain`]).
pub trait CampaignStore: Send + Sync {
  type Error: StoreError;

  // ── Recipients ────────────────────────────────────────────────────────

  /// Validate and persist a new recipient. Validation failures are
  /// returned before the database is touched.
  fn add_recipient(
    &self,
    input: NewRecipient,
  ) -> impl Future<Output = Result<Recipient, Self::Error>> + Send + '_;

  fn get_recipient(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Recipient>, Self::Error>> + Send + '_;

  /// All recipients, ordered by first name.
  fn list_recipients(
    &self,
  ) -> impl Future<Output = Result<Vec<Recipient>, Self::Error>> + Send + '_;

  /// Recipients whose segment label equals `segment`, ordered by first name.
  fn recipients_in_segment<'a>(
    &'a self,
    segment: &'a str,
  ) -> impl Future<Output = Result<Vec<Recipient>, Self::Error>> + Send + 'a;

  /// Full-row replace.
  fn update_recipient(
    &self,
    id: Uuid,
    input: NewRecipient,
  ) -> impl Future<Output = Result<Recipient, Self::Error>> + Send + '_;

  fn delete_recipient(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Segments ──────────────────────────────────────────────────────────

  /// Persist a new segment; fails if the name is already taken.
  fn add_segment(
    &self,
    input: NewSegment,
  ) -> impl Future<Output = Result<Segment, Self::Error>> + Send + '_;

  fn get_segment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Segment>, Self::Error>> + Send + '_;

  /// All segments, newest first.
  fn list_segments(
    &self,
  ) -> impl Future<Output = Result<Vec<Segment>, Self::Error>> + Send + '_;

  /// Full-row replace. Recipients carrying the old name are not relabelled.
  fn update_segment(
    &self,
    id: Uuid,
    input: NewSegment,
  ) -> impl Future<Output = Result<Segment, Self::Error>> + Send + '_;

  /// Delete a segment; rejected while any recipient carries its name.
  fn delete_segment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn count_recipients_in_segment<'a>(
    &'a self,
    segment: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Sorted union of segment names and labels in use on recipients.
  fn list_segment_labels(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Variants ──────────────────────────────────────────────────────────

  /// Persist a new variant, assigning the next free variation key when none
  /// is given. Fails on a duplicate key or when the segment is full.
  fn add_variant(
    &self,
    input: NewVariant,
  ) -> impl Future<Output = Result<Variant, Self::Error>> + Send + '_;

  fn get_variant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Variant>, Self::Error>> + Send + '_;

  /// Variants ordered by segment then key, optionally for one segment.
  fn list_variants(
    &self,
    segment: Option<String>,
  ) -> impl Future<Output = Result<Vec<Variant>, Self::Error>> + Send + '_;

  /// Full-row replace. A missing key keeps the current one.
  fn update_variant(
    &self,
    id: Uuid,
    input: NewVariant,
  ) -> impl Future<Output = Result<Variant, Self::Error>> + Send + '_;

  /// Delete a variant; rejected while a campaign lists it explicitly.
  fn delete_variant(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Campaigns ─────────────────────────────────────────────────────────

  /// Persist a new campaign in [`CampaignStatus::Draft`].
  fn add_campaign(
    &self,
    input: NewCampaign,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  fn get_campaign(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Campaign>, Self::Error>> + Send + '_;

  /// All campaigns in creation order.
  fn list_campaigns(
    &self,
  ) -> impl Future<Output = Result<Vec<Campaign>, Self::Error>> + Send + '_;

  /// Replace the campaign definition; status is left untouched.
  fn update_campaign(
    &self,
    id: Uuid,
    input: NewCampaign,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  /// Apply a manual status change, checked with
  /// [`CampaignStatus::transition`].
  fn set_campaign_status(
    &self,
    id: Uuid,
    status: CampaignStatus,
  ) -> impl Future<Output = Result<Campaign, Self::Error>> + Send + '_;

  fn delete_campaign(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Send log ──────────────────────────────────────────────────────────

  /// Append a send-log row; `sent_at` is set by the store.
  fn record_send(
    &self,
    input: NewEmailSend,
  ) -> impl Future<Output = Result<EmailSend, Self::Error>> + Send + '_;

  /// Send-log rows, newest first.
  fn list_sends<'a>(
    &'a self,
    query: &'a SendQuery,
  ) -> impl Future<Output = Result<Vec<EmailSend>, Self::Error>> + Send + 'a;
}
