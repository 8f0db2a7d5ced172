//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use splitmail_core::StoreError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The email provider failed; the message is shown to the caller as is.
  #[error("{0}")]
  Delivery(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by the domain error it carries, if any.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    if let Some(domain) = err.domain() {
      let message = domain.to_string();
      if domain.is_not_found() {
        return Self::NotFound(message);
      }
      if domain.is_conflict() {
        return Self::Conflict(message);
      }
      if matches!(domain, splitmail_core::Error::Invalid { .. }) {
        return Self::BadRequest(message);
      }
    }
    Self::Store(Box::new(err))
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Delivery(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use splitmail_core::Error;
  use uuid::Uuid;

  use super::*;

  #[test]
  fn domain_errors_map_to_status_codes() {
    let cases = [
      (Error::CampaignNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (Error::DuplicateSegment("S".into()), StatusCode::CONFLICT),
      (
        Error::Invalid { field: "email", reason: "bad".into() },
        StatusCode::BAD_REQUEST,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from_store(err).into_response().status(), status);
    }
  }
}
