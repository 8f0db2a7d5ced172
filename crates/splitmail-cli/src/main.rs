//! `splitmail`: command-line client for a running splitmail-server.
//!
//! # Usage
//!
//! ```text
//! splitmail --url http://localhost:8080 recipients list --segment HighSpender
//! splitmail campaigns test-run 6f1c…
//! splitmail --config ~/.config/splitmail/config.toml segments labels
//! ```

mod client;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client::ApiClient;
use serde::Deserialize;
use splitmail_core::{
  campaign::{AssignmentMethod, CampaignSegment, CampaignStatus, NewCampaign},
  recipient::NewRecipient,
  segment::NewSegment,
  variant::NewVariant,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "splitmail", about = "Manage Splitmail recipients, variants and campaigns")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the splitmail server (default: http://localhost:8080).
  #[arg(long, env = "SPLITMAIL_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Recipients and their segment labels.
  #[command(subcommand)]
  Recipients(RecipientCmd),
  #[command(subcommand)]
  Segments(SegmentCmd),
  #[command(subcommand)]
  Variants(VariantCmd),
  #[command(subcommand)]
  Campaigns(CampaignCmd),
  /// Show the send log, newest first.
  Sends {
    #[arg(long)]
    recipient: Option<Uuid>,
    #[arg(long)]
    campaign:  Option<Uuid>,
    #[arg(long)]
    limit:     Option<usize>,
  },
  /// Send one rendered email without touching the store.
  TestEmail {
    #[arg(long)]
    to:         String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    subject:    String,
    #[arg(long, default_value = "")]
    headline:   String,
    /// HTML body; `{{firstName}}` and `{{headline}}` are substituted.
    #[arg(long)]
    body:       String,
  },
}

#[derive(Subcommand, Debug)]
enum RecipientCmd {
  List {
    #[arg(long)]
    segment: Option<String>,
  },
  Add {
    first_name: String,
    email:      String,
    segment:    String,
  },
  Remove {
    id: Uuid,
  },
}

#[derive(Subcommand, Debug)]
enum SegmentCmd {
  List,
  Add {
    name:        String,
    #[arg(long)]
    description: Option<String>,
  },
  Remove {
    id: Uuid,
  },
  /// Every label in use, from segments and recipients.
  Labels,
}

#[derive(Subcommand, Debug)]
enum VariantCmd {
  List {
    #[arg(long)]
    segment: Option<String>,
  },
  Add {
    #[arg(long)]
    segment:   String,
    #[arg(long)]
    subject:   String,
    /// Variation key; the next free letter when omitted.
    #[arg(long)]
    key:       Option<String>,
    #[arg(long, default_value = "")]
    headline:  String,
    /// Read the HTML body from a file.
    #[arg(long, conflicts_with = "body")]
    body_file: Option<PathBuf>,
    #[arg(long, default_value = "")]
    body:      String,
    #[arg(long, default_value = "")]
    cta:       String,
    #[arg(long, default_value = "")]
    image_url: String,
  },
  Remove {
    id: Uuid,
  },
}

#[derive(Subcommand, Debug)]
enum CampaignCmd {
  List,
  Add {
    #[arg(long)]
    name:     String,
    /// Target segment label; repeat for several.
    #[arg(long = "segment", required = true)]
    segments: Vec<String>,
    #[arg(long)]
    start:    NaiveDate,
    #[arg(long)]
    end:      NaiveDate,
    #[arg(long, value_parser = parse_method, default_value = "random")]
    method:   AssignmentMethod,
  },
  /// Move a campaign to `draft`, `active`, `paused` or `completed`.
  Status {
    id:     Uuid,
    #[arg(value_parser = parse_status)]
    status: CampaignStatus,
  },
  /// Send every recipient of the campaign one randomly drawn variant.
  TestRun {
    id: Uuid,
  },
  Remove {
    id: Uuid,
  },
}

fn parse_status(s: &str) -> Result<CampaignStatus, String> {
  CampaignStatus::parse(s).ok_or_else(|| format!("unknown status {s:?}"))
}

fn parse_method(s: &str) -> Result<AssignmentMethod, String> {
  AssignmentMethod::parse(s).ok_or_else(|| format!("unknown assignment method {s:?}"))
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

/// CLI flag (or `SPLITMAIL_URL`) over config file over the default.
fn resolve_url(flag: Option<String>, file_cfg: &ConfigFile) -> String {
  flag
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(resolve_url(args.url, &file_cfg))?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Recipients(cmd) => recipients(client, cmd).await,
    Command::Segments(cmd) => segments(client, cmd).await,
    Command::Variants(cmd) => variants(client, cmd).await,
    Command::Campaigns(cmd) => campaigns(client, cmd).await,
    Command::Sends { recipient, campaign, limit } => {
      for send in client.list_sends(recipient, campaign, limit).await? {
        println!(
          "{}  recipient={}  variant={} ({})  message={}",
          send.sent_at.format("%Y-%m-%d %H:%M:%S"),
          send.recipient_id,
          send.variant_id,
          send.variation_used,
          send.message_id.as_deref().unwrap_or("-"),
        );
      }
      Ok(())
    }
    Command::TestEmail { to, first_name, subject, headline, body } => {
      let message_id = client
        .send_test_email(&first_name, &to, &subject, &headline, &body)
        .await?;
      println!("sent to {to} (message {message_id})");
      Ok(())
    }
  }
}

async fn recipients(client: &ApiClient, cmd: RecipientCmd) -> Result<()> {
  match cmd {
    RecipientCmd::List { segment } => {
      for r in client.list_recipients(segment.as_deref()).await? {
        println!("{}  {:<16} {:<32} {}", r.recipient_id, r.first_name, r.email, r.segment);
      }
    }
    RecipientCmd::Add { first_name, email, segment } => {
      let r = client
        .add_recipient(&NewRecipient::new(first_name, email, segment))
        .await?;
      println!("added recipient {}", r.recipient_id);
    }
    RecipientCmd::Remove { id } => {
      client.delete_recipient(id).await?;
      println!("removed recipient {id}");
    }
  }
  Ok(())
}

async fn segments(client: &ApiClient, cmd: SegmentCmd) -> Result<()> {
  match cmd {
    SegmentCmd::List => {
      for s in client.list_segments().await? {
        println!("{}  {:<24} {}", s.segment_id, s.name, s.description.unwrap_or_default());
      }
    }
    SegmentCmd::Add { name, description } => {
      let s = client.add_segment(&NewSegment { name, description }).await?;
      println!("added segment {} ({})", s.name, s.segment_id);
    }
    SegmentCmd::Remove { id } => {
      client.delete_segment(id).await?;
      println!("removed segment {id}");
    }
    SegmentCmd::Labels => {
      for label in client.segment_labels().await? {
        println!("{label}");
      }
    }
  }
  Ok(())
}

async fn variants(client: &ApiClient, cmd: VariantCmd) -> Result<()> {
  match cmd {
    VariantCmd::List { segment } => {
      for v in client.list_variants(segment.as_deref()).await? {
        println!("{}  {:<20} {}  {}", v.variant_id, v.segment, v.variation_key, v.subject_line);
      }
    }
    VariantCmd::Add { segment, subject, key, headline, body_file, body, cta, image_url } => {
      let email_body = match body_file {
        Some(path) => std::fs::read_to_string(&path)
          .with_context(|| format!("reading body file {}", path.display()))?,
        None => body,
      };
      let v = client
        .add_variant(&NewVariant {
          segment,
          variation_key: key,
          subject_line: subject,
          headline,
          email_body,
          call_to_action: cta,
          image_url,
        })
        .await?;
      println!("added variant {} to {} ({})", v.variation_key, v.segment, v.variant_id);
    }
    VariantCmd::Remove { id } => {
      client.delete_variant(id).await?;
      println!("removed variant {id}");
    }
  }
  Ok(())
}

async fn campaigns(client: &ApiClient, cmd: CampaignCmd) -> Result<()> {
  match cmd {
    CampaignCmd::List => {
      for c in client.list_campaigns().await? {
        let segments: Vec<_> = c.segments.iter().map(|s| s.segment.as_str()).collect();
        println!(
          "{}  {:<24} {:<9} {} → {}  [{}]",
          c.campaign_id,
          c.name,
          c.status,
          c.start_date,
          c.end_date,
          segments.join(", "),
        );
      }
    }
    CampaignCmd::Add { name, segments, start, end, method } => {
      let c = client
        .add_campaign(&NewCampaign {
          name,
          segments: segments.into_iter().map(CampaignSegment::all_variants).collect(),
          start_date: start,
          end_date: end,
          assignment_method: method,
        })
        .await?;
      println!("added campaign {} ({})", c.name, c.campaign_id);
    }
    CampaignCmd::Status { id, status } => {
      let c = client.set_status(id, status).await?;
      println!("{} is now {}", c.name, c.status);
    }
    CampaignCmd::TestRun { id } => {
      let report = client.test_run(id).await?;
      for sent in &report.sent {
        println!("sent {} to {} ({})", sent.variation_key, sent.email, sent.segment);
      }
      for skipped in &report.skipped {
        println!("skipped {} ({:?})", skipped.segment, skipped.reason);
      }
      println!("{}: {} email(s) sent", report.campaign_name, report.sent.len());
    }
    CampaignCmd::Remove { id } => {
      client.delete_campaign(id).await?;
      println!("removed campaign {id}");
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_precedence_is_flag_then_file_then_default() {
    let file = ConfigFile { url: "http://file:1".into() };
    assert_eq!(resolve_url(Some("http://flag:2".into()), &file), "http://flag:2");
    assert_eq!(resolve_url(None, &file), "http://file:1");
    assert_eq!(resolve_url(None, &ConfigFile::default()), DEFAULT_URL);
  }

  #[test]
  fn parses_campaign_add_with_repeated_segments() {
    let args = Args::try_parse_from([
      "splitmail",
      "campaigns",
      "add",
      "--name",
      "June",
      "--segment",
      "A",
      "--segment",
      "B",
      "--start",
      "2024-06-01",
      "--end",
      "2024-06-30",
      "--method",
      "weighted",
    ])
    .unwrap();

    match args.command {
      Command::Campaigns(CampaignCmd::Add { segments, method, start, .. }) => {
        assert_eq!(segments, ["A", "B"]);
        assert_eq!(method, AssignmentMethod::Weighted);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
      }
      other => panic!("unexpected command {other:?}"),
    }
  }

  #[test]
  fn status_accepts_inactive_alias() {
    let args = Args::try_parse_from([
      "splitmail",
      "campaigns",
      "status",
      "6f1c2f0e-6a53-4a4b-9d0e-0a4f3c3f8d11",
      "inactive",
    ])
    .unwrap();
    assert!(matches!(
      args.command,
      Command::Campaigns(CampaignCmd::Status { status: CampaignStatus::Paused, .. })
    ));
  }

  #[test]
  fn unknown_status_is_rejected() {
    let id = Uuid::nil().to_string();
    let result = Args::try_parse_from(["splitmail", "campaigns", "status", &id, "archived"]);
    assert!(result.is_err());
  }
}
