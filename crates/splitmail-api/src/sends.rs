//! `GET /sends`: the send log, newest first.
//!
//! Query parameters: `recipient_id`, `campaign_id`, `limit` (default 100).

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;
use splitmail_core::{
  send::{EmailSend, SendQuery},
  store::CampaignStore,
};
use uuid::Uuid;

use crate::{error::ApiError, extract::QueryParams};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub recipient_id: Option<Uuid>,
  pub campaign_id:  Option<Uuid>,
  pub limit:        Option<usize>,
}

/// `GET /sends[?recipient_id=<id>][&campaign_id=<id>][&limit=<n>]`
pub async fn list<S: CampaignStore>(
  State(store): State<Arc<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Vec<EmailSend>>, ApiError> {
  let query = SendQuery {
    recipient_id: params.recipient_id,
    campaign_id:  params.campaign_id,
    limit:        params.limit,
  };
  let sends = store.list_sends(&query).await.map_err(ApiError::from_store)?;
  Ok(Json(sends))
}
