//! Segments: named recipient groupings used to target variants.
//!
//! A segment is, at heart, a string label. Recipients carry the label
//! directly; the segment table adds a description and the delete guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, required};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
  pub segment_id:  Uuid,
  /// Unique label; matches [`crate::recipient::Recipient::segment`].
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSegment {
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewSegment {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), description: None }
  }

  /// Trim the name and description; a blank description becomes `None`.
  pub fn validated(&self) -> Result<Self> {
    let name = required("name", &self.name)?;
    let description = self
      .description
      .as_deref()
      .map(str::trim)
      .filter(|d| !d.is_empty())
      .map(str::to_owned);
    Ok(Self { name, description })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  #[test]
  fn blank_description_becomes_none() {
    let seg = NewSegment {
      name:        " Budget ".into(),
      description: Some("   ".into()),
    };
    let out = seg.validated().unwrap();
    assert_eq!(out.name, "Budget");
    assert_eq!(out.description, None);
  }

  #[test]
  fn blank_name_is_rejected() {
    let err = NewSegment::new(" ").validated().unwrap_err();
    assert!(matches!(err, Error::Invalid { field: "name", .. }));
  }
}
