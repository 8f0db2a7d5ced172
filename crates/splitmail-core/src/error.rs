//! Error types for `splitmail-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::campaign::CampaignStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field}: {reason}")]
  Invalid { field: &'static str, reason: String },

  #[error("recipient not found: {0}")]
  RecipientNotFound(Uuid),

  #[error("segment not found: {0}")]
  SegmentNotFound(Uuid),

  #[error("variant not found: {0}")]
  VariantNotFound(Uuid),

  #[error("campaign not found: {0}")]
  CampaignNotFound(Uuid),

  #[error("a segment named {0:?} already exists")]
  DuplicateSegment(String),

  #[error("segment {segment:?} already has a variant {key:?}")]
  DuplicateVariationKey { segment: String, key: String },

  #[error("segment {segment:?} already has the maximum of {max} variants")]
  VariantLimit { segment: String, max: usize },

  #[error("segment {name:?} is still assigned to {recipients} recipient(s)")]
  SegmentInUse { name: String, recipients: u64 },

  #[error("variant {variant_id} is still used by campaign {campaign:?}")]
  VariantInUse { variant_id: Uuid, campaign: String },

  #[error("cannot move a campaign from {from} to {to}")]
  InvalidTransition {
    from: CampaignStatus,
    to:   CampaignStatus,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Invalid { field, reason: reason.into() }
  }

  /// `true` for the `*NotFound` variants.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::RecipientNotFound(_)
        | Self::SegmentNotFound(_)
        | Self::VariantNotFound(_)
        | Self::CampaignNotFound(_)
    )
  }

  /// `true` when the request conflicts with data already in the store.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::DuplicateSegment(_)
        | Self::DuplicateVariationKey { .. }
        | Self::VariantLimit { .. }
        | Self::SegmentInUse { .. }
        | Self::VariantInUse { .. }
        | Self::InvalidTransition { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by store backend errors so that callers can recover the
/// domain-level cause without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The wrapped [`Error`], if this failure originated in the domain layer
  /// rather than in the backend itself.
  fn domain(&self) -> Option<&Error>;
}

impl StoreError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
