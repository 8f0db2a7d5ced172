//! Handlers for `/recipients` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/recipients` | Optional `?segment=<label>` |
//! | `POST`   | `/recipients` | Body: `{"first_name","email","segment"}` → 201 |
//! | `GET`    | `/recipients/{id}` | 404 if not found |
//! | `PUT`    | `/recipients/{id}` | Full replace |
//! | `DELETE` | `/recipients/{id}` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use splitmail_core::{
  recipient::{NewRecipient, Recipient},
  store::CampaignStore,
};
use uuid::Uuid;

use crate::{error::ApiError, extract::{JsonBody, QueryParams}};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub segment: Option<String>,
}

/// `GET /recipients[?segment=<label>]`
pub async fn list<S: CampaignStore>(
  State(store): State<Arc<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Vec<Recipient>>, ApiError> {
  let recipients = match params.segment {
    Some(segment) => store.recipients_in_segment(&segment).await,
    None => store.list_recipients().await,
  }
  .map_err(ApiError::from_store)?;
  Ok(Json(recipients))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /recipients`
pub async fn create<S: CampaignStore>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewRecipient>,
) -> Result<impl IntoResponse, ApiError> {
  let recipient = store.add_recipient(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(recipient)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /recipients/{id}`
pub async fn get_one<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Recipient>, ApiError> {
  store
    .get_recipient(id)
    .await
    .map_err(ApiError::from_store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("recipient {id}")))
}

// ─── Update / delete ──────────────────────────────────────────────────────────

/// `PUT /recipients/{id}`
pub async fn update<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<NewRecipient>,
) -> Result<Json<Recipient>, ApiError> {
  let recipient = store
    .update_recipient(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(recipient))
}

/// `DELETE /recipients/{id}`
pub async fn remove<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_recipient(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
