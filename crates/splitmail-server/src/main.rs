//! splitmail-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid with
//! `SPLITMAIL_*` environment variables, opens the SQLite store and serves the
//! JSON API under `/api`.
//!
//! ```toml
//! store_path     = "~/.local/share/splitmail/splitmail.db"
//! resend_api_key = "re_..."
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use splitmail_api::ApiState;
use splitmail_resend::ResendMailer;
use splitmail_server::{ServerConfig, seed::seed};
use splitmail_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Splitmail campaign server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Load demo recipients and variants into an empty store before serving.
  #[arg(long)]
  seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = server_cfg
    .prepare_store_path()
    .with_context(|| format!("failed to create data directory for {:?}", server_cfg.store_path))?;
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if cli.seed {
    seed(&store).await.context("failed to seed demo data")?;
  }

  let mailer = ResendMailer::new(server_cfg.resend_api_key.clone())
    .context("failed to build Resend client")?
    .with_base_url(server_cfg.resend_base_url.clone());

  let state = ApiState::new(Arc::new(store), Arc::new(mailer), server_cfg.delivery());
  let app = splitmail_server::app(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
