//! Core types and trait definitions for Splitmail.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store and mailer backends implement [`store::CampaignStore`] and
//! [`delivery::Mailer`]; the test-run engine in [`test_run`] only talks to
//! those traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod assign;
pub mod campaign;
pub mod delivery;
pub mod error;
pub mod recipient;
pub mod render;
pub mod segment;
pub mod send;
pub mod store;
pub mod test_run;
pub mod variant;

pub use error::{Error, Result, StoreError};

/// Trim `value` and reject it if nothing is left.
pub(crate) fn required(field: &'static str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::invalid(field, "must not be empty"));
  }
  Ok(trimmed.to_owned())
}
