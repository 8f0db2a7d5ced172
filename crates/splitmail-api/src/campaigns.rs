//! Handlers for `/campaigns` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/campaigns` | Creation order |
//! | `POST`   | `/campaigns` | New campaigns start as `draft` → 201 |
//! | `GET`    | `/campaigns/{id}` | |
//! | `PUT`    | `/campaigns/{id}` | Definition only; status is untouched |
//! | `DELETE` | `/campaigns/{id}` | 204 |
//! | `POST`   | `/campaigns/{id}/status` | Body: `{"status":"active"}`; 409 on a disallowed move |
//! | `POST`   | `/campaigns/{id}/test-run` | Sends one email per recipient; 500 on the first delivery failure |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use splitmail_core::{
  campaign::{Campaign, CampaignStatus, NewCampaign},
  delivery::Mailer,
  store::CampaignStore,
  test_run::{TestRunError, TestRunReport, run_test},
};
use tracing::error;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, extract::JsonBody};

// ─── CRUD ─────────────────────────────────────────────────────────────────────

/// `GET /campaigns`
pub async fn list<S: CampaignStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Campaign>>, ApiError> {
  let campaigns = store.list_campaigns().await.map_err(ApiError::from_store)?;
  Ok(Json(campaigns))
}

/// `POST /campaigns`
pub async fn create<S: CampaignStore>(
  State(store): State<Arc<S>>,
  JsonBody(body): JsonBody<NewCampaign>,
) -> Result<impl IntoResponse, ApiError> {
  let campaign = store.add_campaign(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(campaign)))
}

async fn fetch<S: CampaignStore>(store: &S, id: Uuid) -> Result<Campaign, ApiError> {
  store
    .get_campaign(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("campaign {id}")))
}

/// `GET /campaigns/{id}`
pub async fn get_one<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
  Ok(Json(fetch(&*store, id).await?))
}

/// `PUT /campaigns/{id}`
pub async fn update<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<NewCampaign>,
) -> Result<Json<Campaign>, ApiError> {
  let campaign = store
    .update_campaign(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(campaign))
}

/// `DELETE /campaigns/{id}`
pub async fn remove<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  store.delete_campaign(id).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: CampaignStatus,
}

/// `POST /campaigns/{id}/status`
pub async fn set_status<S: CampaignStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  JsonBody(body): JsonBody<StatusBody>,
) -> Result<Json<Campaign>, ApiError> {
  let campaign = store
    .set_campaign_status(id, body.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(campaign))
}

// ─── Test run ─────────────────────────────────────────────────────────────────

/// `POST /campaigns/{id}/test-run`
pub async fn test_run<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TestRunReport>, ApiError>
where
  S: CampaignStore,
  M: Mailer,
{
  let campaign = fetch(&*state.store, id).await?;

  let report = run_test(&*state.store, &*state.mailer, &campaign, &state.delivery)
    .await
    .map_err(|err| match err {
      TestRunError::Store(e) => ApiError::from_store(e),
      delivery @ TestRunError::Delivery { .. } => {
        error!(campaign_id = %id, error = %delivery, "test run aborted");
        ApiError::Delivery(delivery.to_string())
      }
    })?;

  Ok(Json(report))
}
