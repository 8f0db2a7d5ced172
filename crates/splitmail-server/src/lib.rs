//! HTTP server assembly for Splitmail: configuration, the top-level router
//! and demo seed data.

pub mod seed;

use std::path::{Path, PathBuf};

use axum::Router;
use serde::Deserialize;
use splitmail_api::{ApiState, api_router};
use splitmail_core::{
  delivery::{DEFAULT_FROM, DeliveryConfig, Mailer},
  store::CampaignStore,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` overlaid
/// with `SPLITMAIL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  pub store_path:      PathBuf,
  pub resend_api_key:  String,
  #[serde(default = "default_resend_base_url")]
  pub resend_base_url: String,
  #[serde(default = "default_from_address")]
  pub from_address:    String,
  #[serde(default = "default_record_sends")]
  pub record_sends:    bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_resend_base_url() -> String { splitmail_resend::DEFAULT_BASE_URL.to_owned() }

fn default_from_address() -> String { DEFAULT_FROM.to_owned() }

fn default_record_sends() -> bool { true }

impl ServerConfig {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_file_source(config::File::from(path).required(false))
  }

  fn from_file_source<T>(file: T) -> Result<Self, config::ConfigError>
  where
    T: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(config::Environment::with_prefix("SPLITMAIL").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn delivery(&self) -> DeliveryConfig {
    DeliveryConfig {
      from:         self.from_address.clone(),
      record_sends: self.record_sends,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// The store path with `~` expanded. Its parent directory is created if
  /// missing.
  pub fn prepare_store_path(&self) -> std::io::Result<PathBuf> {
    let path = expand_tilde(&self.store_path);
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    Ok(path)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn app<S, M>(state: ApiState<S, M>) -> Router
where
  S: CampaignStore + 'static,
  M: Mailer + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{File, FileFormat};
  use splitmail_core::delivery::{OutgoingEmail, SendReceipt};
  use splitmail_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn config_defaults_fill_optional_fields() {
    let cfg = ServerConfig::from_file_source(File::from_str(
      r#"
        store_path     = "~/splitmail.db"
        resend_api_key = "re_test"
      "#,
      FileFormat::Toml,
    ))
    .unwrap();

    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.resend_base_url, "https://api.resend.com");
    assert_eq!(cfg.delivery(), DeliveryConfig::default());
  }

  #[test]
  fn config_overrides_are_respected() {
    let cfg = ServerConfig::from_file_source(File::from_str(
      r#"
        host           = "0.0.0.0"
        port           = 9000
        store_path     = "/tmp/s.db"
        resend_api_key = "re_test"
        from_address   = "Shop <shop@example.com>"
        record_sends   = false
      "#,
      FileFormat::Toml,
    ))
    .unwrap();

    assert_eq!(cfg.address(), "0.0.0.0:9000");
    let delivery = cfg.delivery();
    assert_eq!(delivery.from, "Shop <shop@example.com>");
    assert!(!delivery.record_sends);
  }

  #[test]
  fn missing_api_key_is_an_error() {
    let result = ServerConfig::from_file_source(File::from_str(
      r#"store_path = "/tmp/s.db""#,
      FileFormat::Toml,
    ));
    assert!(result.is_err());
  }

  fn config_with_store(store_path: &Path) -> ServerConfig {
    ServerConfig {
      host:            default_host(),
      port:            default_port(),
      store_path:      store_path.to_path_buf(),
      resend_api_key:  "re_test".into(),
      resend_base_url: default_resend_base_url(),
      from_address:    default_from_address(),
      record_sends:    default_record_sends(),
    }
  }

  #[tokio::test]
  async fn store_directory_is_created_on_first_start() {
    let dir = tempfile::tempdir().unwrap();
    let wanted = dir.path().join("share").join("splitmail").join("splitmail.db");

    let path = config_with_store(&wanted).prepare_store_path().unwrap();
    assert_eq!(path, wanted);
    assert!(wanted.parent().unwrap().is_dir());

    SqliteStore::open(&path).await.unwrap();
    assert!(path.is_file());

    // Already present: still fine.
    config_with_store(&wanted).prepare_store_path().unwrap();
  }

  #[test]
  fn bare_file_name_needs_no_directory() {
    let path = config_with_store(Path::new("splitmail.db")).prepare_store_path().unwrap();
    assert_eq!(path, PathBuf::from("splitmail.db"));
  }

  #[derive(Debug)]
  enum Never {}

  impl std::fmt::Display for Never {
    fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { match *self {} }
  }

  impl std::error::Error for Never {}

  struct NoopMailer;

  impl Mailer for NoopMailer {
    type Error = Never;

    async fn send(&self, _email: OutgoingEmail) -> Result<SendReceipt, Never> {
      Ok(SendReceipt { message_id: "noop".into() })
    }
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = ApiState::new(Arc::new(store), Arc::new(NoopMailer), DeliveryConfig::default());
    let router = app(state);

    let resp = router
      .clone()
      .oneshot(Request::get("/api/segment-labels").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
      .oneshot(Request::get("/segment-labels").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
