//! Request extractors whose rejections render as [`ApiError`].
//!
//! axum's own [`axum::Json`] and [`axum::extract::Query`] reject with
//! plain-text bodies (and `422` for a body that is valid JSON but the wrong
//! shape). These wrappers turn every rejection into a `400` with the usual
//! `{"error": ...}` body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// A JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query-string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);
