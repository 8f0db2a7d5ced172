//! Variants: per-segment content alternatives (the A/B in A/B testing).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, required};

/// Keys handed out, in order, when a variant is added without one.
pub const VARIATION_KEYS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

/// Upper bound on the number of variants a single segment may hold.
pub const MAX_VARIANTS_PER_SEGMENT: usize = VARIATION_KEYS.len();

/// One content alternative for a segment (a `segment_variant_rules` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
  pub variant_id:     Uuid,
  pub segment:        String,
  /// Unique within `segment`, e.g. `"A"`.
  pub variation_key:  String,
  pub subject_line:   String,
  pub headline:       String,
  /// Body template; may contain `{{firstName}}` and `{{headline}}`.
  pub email_body:     String,
  pub call_to_action: String,
  pub image_url:      String,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
  pub segment:        String,
  /// Assigned by the store (next free letter) when absent.
  #[serde(default, alias = "variationKey")]
  pub variation_key:  Option<String>,
  #[serde(alias = "subjectLine")]
  pub subject_line:   String,
  #[serde(default)]
  pub headline:       String,
  #[serde(default, alias = "html_body", alias = "emailBody")]
  pub email_body:     String,
  #[serde(default, alias = "callToAction")]
  pub call_to_action: String,
  #[serde(default, alias = "imageUrl")]
  pub image_url:      String,
}

impl NewVariant {
  /// Check required fields and normalise the variation key, if any.
  pub fn validated(&self) -> Result<Self> {
    let segment = required("segment", &self.segment)?;
    let subject_line = required("subject_line", &self.subject_line)?;
    let variation_key = self
      .variation_key
      .as_deref()
      .map(normalize_key)
      .transpose()?;
    Ok(Self {
      segment,
      variation_key,
      subject_line,
      headline: self.headline.trim().to_owned(),
      email_body: self.email_body.clone(),
      call_to_action: self.call_to_action.trim().to_owned(),
      image_url: self.image_url.trim().to_owned(),
    })
  }
}

/// Trim and upper-case a variation key.
pub fn normalize_key(key: &str) -> Result<String> {
  let key = key.trim();
  if key.is_empty() {
    return Err(Error::invalid("variation_key", "must not be empty"));
  }
  Ok(key.to_uppercase())
}

/// The first key from [`VARIATION_KEYS`] not already in `taken`.
pub fn next_free_key<K: AsRef<str>>(taken: &[K]) -> Option<&'static str> {
  VARIATION_KEYS
    .iter()
    .copied()
    .find(|candidate| !taken.iter().any(|t| t.as_ref() == *candidate))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keys_are_upper_cased() {
    assert_eq!(normalize_key(" b ").unwrap(), "B");
    assert!(normalize_key("  ").is_err());
  }

  #[test]
  fn next_free_key_fills_gaps() {
    assert_eq!(next_free_key::<&str>(&[]), Some("A"));
    assert_eq!(next_free_key(&["A", "C"]), Some("B"));
    assert_eq!(next_free_key(&VARIATION_KEYS), None);
  }

  #[test]
  fn accepts_html_body_alias() {
    let v: NewVariant = serde_json::from_str(
      r#"{"segment":"s","subject_line":"Hi","html_body":"Dear {{firstName}}"}"#,
    )
    .unwrap();
    assert_eq!(v.email_body, "Dear {{firstName}}");
    assert_eq!(v.variation_key, None);
  }

  #[test]
  fn missing_subject_is_rejected() {
    let v = NewVariant { segment: "s".into(), ..Default::default() };
    assert!(matches!(
      v.validated(),
      Err(Error::Invalid { field: "subject_line", .. })
    ));
  }
}
