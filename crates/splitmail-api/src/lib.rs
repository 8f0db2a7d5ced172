//! JSON REST API for Splitmail.
//!
//! Exposes an axum [`Router`] backed by any
//! [`splitmail_core::store::CampaignStore`] and
//! [`splitmail_core::delivery::Mailer`]. There is no authentication; TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", splitmail_api::api_router(state))
//! ```

pub mod campaigns;
pub mod error;
pub mod extract;
pub mod recipients;
pub mod segments;
pub mod sends;
pub mod test_email;
pub mod variants;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRef,
  routing::{get, post},
};
use splitmail_core::{
  delivery::{DeliveryConfig, Mailer},
  store::CampaignStore,
};

pub use error::ApiError;

/// Shared handler state.
///
/// CRUD handlers only extract `State<Arc<S>>`; the sending handlers take the
/// whole state.
pub struct ApiState<S, M> {
  pub store:    Arc<S>,
  pub mailer:   Arc<M>,
  pub delivery: Arc<DeliveryConfig>,
}

impl<S, M> ApiState<S, M> {
  pub fn new(store: Arc<S>, mailer: Arc<M>, delivery: DeliveryConfig) -> Self {
    Self { store, mailer, delivery: Arc::new(delivery) }
  }
}

// Derived `Clone` would require `S: Clone` and `M: Clone`.
impl<S, M> Clone for ApiState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      mailer:   self.mailer.clone(),
      delivery: self.delivery.clone(),
    }
  }
}

impl<S, M> FromRef<ApiState<S, M>> for Arc<S> {
  fn from_ref(state: &ApiState<S, M>) -> Self { state.store.clone() }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, M>(state: ApiState<S, M>) -> Router<()>
where
  S: CampaignStore + 'static,
  M: Mailer + 'static,
{
  Router::new()
    // Recipients
    .route(
      "/recipients",
      get(recipients::list::<S>).post(recipients::create::<S>),
    )
    .route(
      "/recipients/{id}",
      get(recipients::get_one::<S>)
        .put(recipients::update::<S>)
        .delete(recipients::remove::<S>),
    )
    // Segments
    .route("/segments", get(segments::list::<S>).post(segments::create::<S>))
    .route(
      "/segments/{id}",
      get(segments::get_one::<S>)
        .put(segments::update::<S>)
        .delete(segments::remove::<S>),
    )
    .route("/segment-labels", get(segments::labels::<S>))
    // Variants
    .route("/variants", get(variants::list::<S>).post(variants::create::<S>))
    .route(
      "/variants/{id}",
      get(variants::get_one::<S>)
        .put(variants::update::<S>)
        .delete(variants::remove::<S>),
    )
    // Campaigns
    .route(
      "/campaigns",
      get(campaigns::list::<S>).post(campaigns::create::<S>),
    )
    .route(
      "/campaigns/{id}",
      get(campaigns::get_one::<S>)
        .put(campaigns::update::<S>)
        .delete(campaigns::remove::<S>),
    )
    .route("/campaigns/{id}/status", post(campaigns::set_status::<S>))
    .route("/campaigns/{id}/test-run", post(campaigns::test_run::<S, M>))
    // Send log
    .route("/sends", get(sends::list::<S>))
    // One-off send
    .route("/send-test-email", post(test_email::send::<S, M>))
    .with_state(state)
}
