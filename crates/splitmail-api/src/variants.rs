//! Handlers for `/variants` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/variants` | Optional `?segment=<label>` |
//! | `POST`   | `/variants` | `variation_key` optional, next free letter when absent |
//! | `GET`    | `/variants/{id}` | |
//! | `PUT`    | `/variants/{id}` | Missing key keeps the current one |
//! | `DELETE` | `/variants/{id}` | 409 while a campaign lists it |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use splitmail_core::{
  store::CampaignStore,
  variant::{NewVariant, Variant},
};
use uuid::Uuid;

use crate::{error::ApiError, extract::{JsonBody, QueryParams}};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub segment: Option<String>,
}

/// `GET /variants[?segment=<label>]`
pub async fn list<S: CampaignStore>(
  State(store): State<Arc<S>>,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Vec<Variant>>, ApiError> {
  let variants = store
    .list_variants(params.segment)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(variants))
}

/// `POST /variants`
pub async fn create<S: CampaignStore>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewVariant>,
) -> Result<impl IntoResponse, ApiError> {
  let variant = store.add_variant(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(variant)))
}

/// `GET /variants/{id}`
pub async fn get_one<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Variant>, ApiError> {
  store
    .get_variant(id)
    .await
    .map_err(ApiError::from_store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("variant {id}")))
}

/// `PUT /variants/{id}`
pub async fn update<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<NewVariant>,
) -> Result<Json<Variant>, ApiError> {
  let variant = store
    .update_variant(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(variant))
}

/// `DELETE /variants/{id}`
pub async fn remove<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_variant(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
