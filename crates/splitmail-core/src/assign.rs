//! Variant assignment: which candidates a segment entry draws from, and the
//! draw itself.

use rand::{Rng, seq::SliceRandom};

use crate::{campaign::CampaignSegment, variant::Variant};

/// The variants a campaign segment entry may draw from.
///
/// `segment_variants` are all variants of the entry's segment in store
/// order. An empty subset on the entry keeps them all; otherwise only the
/// listed ones survive, still in store order. Ids that do not belong to the
/// segment are ignored.
pub fn candidates(entry: &CampaignSegment, segment_variants: Vec<Variant>) -> Vec<Variant> {
  if entry.variants.is_empty() {
    return segment_variants;
  }
  segment_variants
    .into_iter()
    .filter(|v| entry.variants.contains(&v.variant_id))
    .collect()
}

/// Pick one candidate with equal probability. `None` for an empty slice.
pub fn pick_variant<'a, R: Rng + ?Sized>(
  candidates: &'a [Variant],
  rng: &mut R,
) -> Option<&'a Variant> {
  candidates.choose(rng)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn variant(segment: &str, key: &str) -> Variant {
    Variant {
      variant_id:     Uuid::new_v4(),
      segment:        segment.into(),
      variation_key:  key.into(),
      subject_line:   format!("Subject {key}"),
      headline:       String::new(),
      email_body:     String::new(),
      call_to_action: String::new(),
      image_url:      String::new(),
      created_at:     Utc::now(),
    }
  }

  #[test]
  fn empty_subset_keeps_all_variants() {
    let all = vec![variant("s", "A"), variant("s", "B")];
    let out = candidates(&CampaignSegment::all_variants("s"), all.clone());
    assert_eq!(out, all);
  }

  #[test]
  fn subset_restricts_candidates() {
    let all = vec![variant("s", "A"), variant("s", "B"), variant("s", "C")];
    let entry = CampaignSegment {
      segment:  "s".into(),
      variants: vec![all[2].variant_id, all[0].variant_id, Uuid::new_v4()],
    };
    let keys: Vec<_> = candidates(&entry, all)
      .into_iter()
      .map(|v| v.variation_key)
      .collect();
    assert_eq!(keys, ["A", "C"]);
  }

  #[test]
  fn pick_from_empty_is_none() {
    assert!(pick_variant(&[], &mut rand::thread_rng()).is_none());
  }

  #[test]
  fn pick_draws_only_from_candidates_and_reaches_both() {
    let set = vec![variant("s", "A"), variant("s", "B")];
    let mut rng = rand::thread_rng();
    let (mut a, mut b) = (0, 0);
    for _ in 0..1000 {
      let chosen = pick_variant(&set, &mut rng).unwrap();
      match chosen.variation_key.as_str() {
        "A" => a += 1,
        "B" => b += 1,
        other => panic!("picked a non-candidate {other}"),
      }
    }
    assert!(a > 0 && b > 0, "a={a} b={b}");
    assert_eq!(a + b, 1000);
  }
}
