//! Demo data for a fresh store: three segments, one recipient each and an
//! A/B pair of variants per segment.

use splitmail_core::{
  recipient::NewRecipient, segment::NewSegment, store::CampaignStore, variant::NewVariant,
};
use tracing::info;

struct DemoSegment {
  name:        &'static str,
  description: &'static str,
  recipient:   (&'static str, &'static str),
  variants:    [DemoVariant; 2],
}

struct DemoVariant {
  subject:  &'static str,
  headline: &'static str,
  perks:    &'static str,
  cta:      &'static str,
}

const DEMO: [DemoSegment; 3] = [
  DemoSegment {
    name:        "HighSpender",
    description: "Cardholders with the highest monthly spend",
    recipient:   ("John", "john.doe@example.com"),
    variants:    [
      DemoVariant {
        subject:  "Exclusive Platinum Rewards Await You",
        headline: "Exclusive Platinum Rewards",
        perks:    "5x points on travel, lounge access worldwide, a dedicated concierge",
        cta:      "Upgrade Now",
      },
      DemoVariant {
        subject:  "Double Your Business Rewards Today",
        headline: "Double Points on Business Purchases",
        perks:    "double points on every purchase, travel insurance, exclusive events",
        cta:      "Start Earning",
      },
    ],
  },
  DemoSegment {
    name:        "BusinessTraveler",
    description: "Frequent flyers booking on a company card",
    recipient:   ("Jane", "jane.smith@example.com"),
    variants:    [
      DemoVariant {
        subject:  "Maximize Your Business Travel Benefits",
        headline: "Enhanced Travel Benefits",
        perks:    "3x points on flights and hotels, lounge access, car rental status",
        cta:      "Book Now",
      },
      DemoVariant {
        subject:  "New Travel Management Tools for Your Business",
        headline: "New Expense Management Tools",
        perks:    "central booking, automatic expense tracking, real-time reporting",
        cta:      "Get Started",
      },
    ],
  },
  DemoSegment {
    name:        "BudgetConscious",
    description: "Customers who respond to cash back and financing",
    recipient:   ("Mike", "mike.wilson@example.com"),
    variants:    [
      DemoVariant {
        subject:  "Smart Savings with Business Cash Back",
        headline: "Business Cash Back Program",
        perks:    "5% back on office supplies, 3% on shipping, no category limits",
        cta:      "Start Saving",
      },
      DemoVariant {
        subject:  "Special Financing Offer for Your Business",
        headline: "Special Financing Offer",
        perks:    "0% APR for 12 months, no annual fee, free employee cards",
        cta:      "Apply Now",
      },
    ],
  },
];

fn body(v: &DemoVariant) -> String {
  format!(
    "<p>Dear {{{{firstName}}}},</p>\n<h1>{{{{headline}}}}</h1>\n<p>Enjoy {}.</p>\n<p><strong>{}</strong></p>",
    v.perks, v.cta
  )
}

/// Counts of what [`seed`] created.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Seeded {
  pub segments:   usize,
  pub recipients: usize,
  pub variants:   usize,
}

/// Load the demo data into an empty store; any recipient or segment already
/// present skips the seed.
pub async fn seed<S: CampaignStore>(store: &S) -> Result<Seeded, S::Error> {
  if !store.list_recipients().await?.is_empty() || !store.list_segments().await?.is_empty() {
    info!("store already has data, skipping seed");
    return Ok(Seeded::default());
  }

  let mut seeded = Seeded::default();
  for demo in &DEMO {
    store
      .add_segment(NewSegment {
        name:        demo.name.to_owned(),
        description: Some(demo.description.to_owned()),
      })
      .await?;
    seeded.segments += 1;

    let (first_name, email) = demo.recipient;
    store
      .add_recipient(NewRecipient::new(first_name, email, demo.name))
      .await?;
    seeded.recipients += 1;

    for v in &demo.variants {
      store
        .add_variant(NewVariant {
          segment: demo.name.to_owned(),
          subject_line: v.subject.to_owned(),
          headline: v.headline.to_owned(),
          email_body: body(v),
          call_to_action: v.cta.to_owned(),
          ..Default::default()
        })
        .await?;
      seeded.variants += 1;
    }
  }

  info!(
    segments = seeded.segments,
    recipients = seeded.recipients,
    variants = seeded.variants,
    "seeded demo data"
  );
  Ok(seeded)
}

#[cfg(test)]
mod tests {
  use splitmail_store_sqlite::SqliteStore;

  use super::*;

  #[tokio::test]
  async fn seeds_once() {
    let store = SqliteStore::open_in_memory().await.unwrap();

    let first = seed(&store).await.unwrap();
    assert_eq!(first, Seeded { segments: 3, recipients: 3, variants: 6 });

    let second = seed(&store).await.unwrap();
    assert_eq!(second, Seeded::default());
    assert_eq!(store.list_recipients().await.unwrap().len(), 3);
  }

  #[tokio::test]
  async fn existing_segment_without_recipients_skips_seed() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .add_segment(NewSegment::new("HighSpender"))
      .await
      .unwrap();

    let seeded = seed(&store).await.unwrap();
    assert_eq!(seeded, Seeded::default());
    assert!(store.list_recipients().await.unwrap().is_empty());
    assert_eq!(store.list_segments().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn each_segment_gets_an_ab_pair() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    seed(&store).await.unwrap();

    for name in ["HighSpender", "BusinessTraveler", "BudgetConscious"] {
      let keys: Vec<_> = store
        .list_variants(Some(name.to_owned()))
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.variation_key)
        .collect();
      assert_eq!(keys, ["A", "B"], "{name}");
    }
  }

  #[test]
  fn demo_bodies_carry_placeholders() {
    let text = body(&DEMO[0].variants[0]);
    assert!(text.contains("{{firstName}}"));
    assert!(text.contains("{{headline}}"));
  }
}
