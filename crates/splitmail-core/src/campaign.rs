//! Campaigns: a dated association between segments and their variants.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, required};

// ─── Assignment method ───────────────────────────────────────────────────────

/// How a variant is chosen for each recipient during a test run.
///
/// Only [`AssignmentMethod::Random`] has an algorithm behind it; the other
/// two are stored as entered and run as random.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMethod {
  #[default]
  Random,
  Sequential,
  Weighted,
}

impl AssignmentMethod {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Random => "random",
      Self::Sequential => "sequential",
      Self::Weighted => "weighted",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "random" => Some(Self::Random),
      "sequential" => Some(Self::Sequential),
      "weighted" => Some(Self::Weighted),
      _ => None,
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Campaign lifecycle status. Every transition is a manual action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
  #[default]
  Draft,
  Active,
  #[serde(alias = "inactive")]
  Paused,
  Completed,
}

impl CampaignStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Active => "active",
      Self::Paused => "paused",
      Self::Completed => "completed",
    }
  }

  /// Accepts the serialised names plus `inactive` for [`Self::Paused`].
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "draft" => Some(Self::Draft),
      "active" => Some(Self::Active),
      "paused" | "inactive" => Some(Self::Paused),
      "completed" => Some(Self::Completed),
      _ => None,
    }
  }

  /// Whether a manual move from `self` to `next` is allowed. Re-applying the
  /// current status is always allowed.
  pub fn can_transition_to(self, next: Self) -> bool {
    use CampaignStatus::*;
    self == next
      || matches!(
        (self, next),
        (Draft, Active)
          | (Active, Paused)
          | (Paused, Active)
          | (Active, Completed)
          | (Paused, Completed)
      )
  }

  /// Return `next` if the move is allowed.
  pub fn transition(self, next: Self) -> Result<Self> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(Error::InvalidTransition { from: self, to: next })
    }
  }
}

impl fmt::Display for CampaignStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Campaign ────────────────────────────────────────────────────────────────

/// One targeted segment within a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSegment {
  /// Segment label, matched against [`crate::recipient::Recipient::segment`].
  #[serde(alias = "segmentId")]
  pub segment:  String,
  /// Restrict the draw to these variants. Empty means every variant of the
  /// segment.
  #[serde(default)]
  pub variants: Vec<Uuid>,
}

impl CampaignSegment {
  pub fn all_variants(segment: impl Into<String>) -> Self {
    Self { segment: segment.into(), variants: Vec::new() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
  pub campaign_id:       Uuid,
  pub name:              String,
  pub segments:          Vec<CampaignSegment>,
  pub start_date:        NaiveDate,
  pub end_date:          NaiveDate,
  pub assignment_method: AssignmentMethod,
  pub status:            CampaignStatus,
  pub created_at:        DateTime<Utc>,
}

impl Campaign {
  /// Whether any segment entry lists `variant_id` explicitly.
  pub fn references_variant(&self, variant_id: Uuid) -> bool {
    self.segments.iter().any(|s| s.variants.contains(&variant_id))
  }
}

/// Input to [`crate::store::CampaignStore::add_campaign`] and
/// [`crate::store::CampaignStore::update_campaign`]. Status is not part of
/// the definition; see [`crate::store::CampaignStore::set_campaign_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
  pub name:              String,
  pub segments:          Vec<CampaignSegment>,
  #[serde(alias = "startDate")]
  pub start_date:        NaiveDate,
  #[serde(alias = "endDate")]
  pub end_date:          NaiveDate,
  #[serde(default, alias = "assignmentMethod")]
  pub assignment_method: AssignmentMethod,
}

impl NewCampaign {
  pub fn validated(&self) -> Result<Self> {
    let name = required("name", &self.name)?;
    if self.segments.is_empty() {
      return Err(Error::invalid("segments", "at least one segment is required"));
    }

    let mut seen = HashSet::new();
    let mut segments = Vec::with_capacity(self.segments.len());
    for entry in &self.segments {
      let label = required("segments", &entry.segment)?;
      if !seen.insert(label.clone()) {
        return Err(Error::invalid("segments", format!("segment {label:?} is listed twice")));
      }
      segments.push(CampaignSegment { segment: label, variants: entry.variants.clone() });
    }

    if self.end_date < self.start_date {
      return Err(Error::invalid("end_date", "must not be before start_date"));
    }

    Ok(Self {
      name,
      segments,
      start_date: self.start_date,
      end_date: self.end_date,
      assignment_method: self.assignment_method,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn campaign(segments: Vec<CampaignSegment>) -> NewCampaign {
    NewCampaign {
      name: "Q1 Business Rewards".into(),
      segments,
      start_date: date("2024-01-01"),
      end_date: date("2024-03-31"),
      assignment_method: AssignmentMethod::Random,
    }
  }

  #[test]
  fn status_transitions() {
    use CampaignStatus::*;
    assert!(Draft.can_transition_to(Active));
    assert!(Active.can_transition_to(Paused));
    assert!(Paused.can_transition_to(Active));
    assert!(Paused.can_transition_to(Completed));
    assert!(Active.can_transition_to(Active));
    assert!(!Draft.can_transition_to(Paused));
    assert!(!Draft.can_transition_to(Completed));
    assert!(!Completed.can_transition_to(Active));
    assert!(matches!(
      Completed.transition(Draft),
      Err(Error::InvalidTransition { from: Completed, to: Draft })
    ));
  }

  #[test]
  fn inactive_is_an_alias_for_paused() {
    let s: CampaignStatus = serde_json::from_str("\"inactive\"").unwrap();
    assert_eq!(s, CampaignStatus::Paused);
    assert_eq!(CampaignStatus::parse("inactive"), Some(CampaignStatus::Paused));
    assert_eq!(serde_json::to_string(&s).unwrap(), "\"paused\"");
  }

  #[test]
  fn campaign_needs_a_segment() {
    let err = campaign(vec![]).validated().unwrap_err();
    assert!(matches!(err, Error::Invalid { field: "segments", .. }));
  }

  #[test]
  fn duplicate_segments_are_rejected() {
    let err = campaign(vec![
      CampaignSegment::all_variants("HighSpender"),
      CampaignSegment::all_variants(" HighSpender "),
    ])
    .validated()
    .unwrap_err();
    assert!(matches!(err, Error::Invalid { field: "segments", .. }));
  }

  #[test]
  fn end_before_start_is_rejected() {
    let mut c = campaign(vec![CampaignSegment::all_variants("HighSpender")]);
    c.end_date = date("2023-12-31");
    assert!(matches!(c.validated(), Err(Error::Invalid { field: "end_date", .. })));
  }

  #[test]
  fn references_variant_checks_explicit_subsets() {
    let id = Uuid::new_v4();
    let c = Campaign {
      campaign_id:       Uuid::new_v4(),
      name:              "c".into(),
      segments:          vec![
        CampaignSegment::all_variants("a"),
        CampaignSegment { segment: "b".into(), variants: vec![id] },
      ],
      start_date:        date("2024-01-01"),
      end_date:          date("2024-01-02"),
      assignment_method: AssignmentMethod::Random,
      status:            CampaignStatus::Draft,
      created_at:        Utc::now(),
    };
    assert!(c.references_variant(id));
    assert!(!c.references_variant(Uuid::new_v4()));
  }
}
