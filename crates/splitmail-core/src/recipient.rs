//! Recipients, the people a campaign sends to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, required};

/// A single addressee, tagged with exactly one segment label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
  pub recipient_id: Uuid,
  pub first_name:   String,
  pub email:        String,
  /// Free-text segment label; not checked against the segment table.
  pub segment:      String,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::CampaignStore::add_recipient`] and
/// [`crate::store::CampaignStore::update_recipient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecipient {
  #[serde(alias = "firstName")]
  pub first_name: String,
  pub email:      String,
  pub segment:    String,
}

impl NewRecipient {
  pub fn new(
    first_name: impl Into<String>,
    email: impl Into<String>,
    segment: impl Into<String>,
  ) -> Self {
    Self {
      first_name: first_name.into(),
      email:      email.into(),
      segment:    segment.into(),
    }
  }

  /// Check required fields and the email shape, returning a trimmed copy.
  pub fn validated(&self) -> Result<Self> {
    let first_name = required("first_name", &self.first_name)?;
    let email = required("email", &self.email)?;
    if !email.contains('@') {
      return Err(Error::invalid("email", format!("{email:?} is not an email address")));
    }
    let segment = required("segment", &self.segment)?;
    Ok(Self { first_name, email, segment })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn valid_recipient_is_trimmed() {
    let input = NewRecipient::new("  Ann ", " ann@example.com", "HighSpender ");
    let out = input.validated().unwrap();
    assert_eq!(out.first_name, "Ann");
    assert_eq!(out.email, "ann@example.com");
    assert_eq!(out.segment, "HighSpender");
  }

  #[test]
  fn email_without_at_sign_is_rejected() {
    let err = NewRecipient::new("Ann", "ann.example.com", "HighSpender")
      .validated()
      .unwrap_err();
    assert!(matches!(err, Error::Invalid { field: "email", .. }), "{err}");
  }

  #[test]
  fn blank_fields_are_rejected() {
    for (input, field) in [
      (NewRecipient::new("", "a@b", "s"), "first_name"),
      (NewRecipient::new("A", "   ", "s"), "email"),
      (NewRecipient::new("A", "a@b", ""), "segment"),
    ] {
      match input.validated() {
        Err(Error::Invalid { field: f, .. }) => assert_eq!(f, field),
        other => panic!("expected invalid {field}, got {other:?}"),
      }
    }
  }

  #[test]
  fn accepts_camel_case_first_name() {
    let parsed: NewRecipient = serde_json::from_str(
      r#"{"firstName":"Ann","email":"ann@example.com","segment":"s"}"#,
    )
    .unwrap();
    assert_eq!(parsed.first_name, "Ann");
  }
}
