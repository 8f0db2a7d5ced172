//! Handlers for `/segments` and `/segment-labels`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/segments` | Newest first |
//! | `POST`   | `/segments` | Body: `{"name","description"?}` → 201, 409 on duplicate name |
//! | `GET`    | `/segments/{id}` | |
//! | `PUT`    | `/segments/{id}` | Recipients keep their old label |
//! | `DELETE` | `/segments/{id}` | 409 while recipients carry the label |
//! | `GET`    | `/segment-labels` | Segment names plus labels in use |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use splitmail_core::{
  segment::{NewSegment, Segment},
  store::CampaignStore,
};
use uuid::Uuid;

use crate::{error::ApiError, extract::JsonBody};

/// `GET /segments`
pub async fn list<S: CampaignStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Segment>>, ApiError> {
  let segments = store.list_segments().await.map_err(ApiError::from_store)?;
  Ok(Json(segments))
}

/// `POST /segments`
pub async fn create<S: CampaignStore>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewSegment>,
) -> Result<impl IntoResponse, ApiError> {
  let segment = store.add_segment(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(segment)))
}

/// `GET /segments/{id}`
pub async fn get_one<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Segment>, ApiError> {
  store
    .get_segment(id)
    .await
    .map_err(ApiError::from_store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("segment {id}")))
}

/// `PUT /segments/{id}`
pub async fn update<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<NewSegment>,
) -> Result<Json<Segment>, ApiError> {
  let segment = store
    .update_segment(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(segment))
}

/// `DELETE /segments/{id}`
pub async fn remove<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_segment(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /segment-labels`
pub async fn labels<S: CampaignStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<String>>, ApiError> {
  let labels = store.list_segment_labels().await.map_err(ApiError::from_store)?;
  Ok(Json(labels))
}
