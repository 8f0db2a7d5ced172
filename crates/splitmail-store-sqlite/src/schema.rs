//! SQL schema for the Splitmail SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// There are no foreign keys: segment labels, variant ids and recipient ids
/// are plain text references and deletes never cascade.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS recipients (
    recipient_id TEXT PRIMARY KEY,
    first_name   TEXT NOT NULL,
    email        TEXT NOT NULL,
    segment      TEXT NOT NULL,   -- segment label, not enforced
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS segments (
    segment_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS segment_variant_rules (
    variant_id     TEXT PRIMARY KEY,
    segment        TEXT NOT NULL,
    variation_key  TEXT NOT NULL,
    subject_line   TEXT NOT NULL,
    headline       TEXT NOT NULL DEFAULT '',
    email_body     TEXT NOT NULL DEFAULT '',
    call_to_action TEXT NOT NULL DEFAULT '',
    image_url      TEXT NOT NULL DEFAULT '',
    created_at     TEXT NOT NULL,
    UNIQUE (segment, variation_key)
);

CREATE TABLE IF NOT EXISTS campaigns (
    campaign_id       TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    segments_json     TEXT NOT NULL,   -- JSON array of CampaignSegment
    start_date        TEXT NOT NULL,   -- YYYY-MM-DD
    end_date          TEXT NOT NULL,
    assignment_method TEXT NOT NULL DEFAULT 'random',
    status            TEXT NOT NULL DEFAULT 'draft',
    created_at        TEXT NOT NULL
);

-- Append-only send log.
CREATE TABLE IF NOT EXISTS email_sends (
    send_id        TEXT PRIMARY KEY,
    recipient_id   TEXT NOT NULL,
    variant_id     TEXT NOT NULL,
    variation_used TEXT NOT NULL,
    campaign_id    TEXT,
    message_id     TEXT,
    sent_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS recipients_segment_idx ON recipients(segment);
CREATE INDEX IF NOT EXISTS sends_recipient_idx    ON email_sends(recipient_id);
CREATE INDEX IF NOT EXISTS sends_campaign_idx     ON email_sends(campaign_id);

PRAGMA user_version = 1;
";
