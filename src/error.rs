// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the HTTP surface.
//!
//! [`ApiError`] owns the mapping from failure class to status code and
//! response body. Messages are meant for end users; upstream details only
//! go to the log.

use crate::limiter::{now_ms, RateLimitResult};
use crate::validator::{FieldError, ValidationErrors};
use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Failures surfaced by the API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body failed validation (400)
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Client exceeded its quota (429 with rate-limit headers)
    #[error("{message}")]
    RateLimited {
        result: RateLimitResult,
        message: String,
    },

    /// Upstream rejected our credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Upstream throttled us (429)
    #[error("{0}")]
    UpstreamThrottled(String),

    /// Destination not configured in production (503)
    #[error("{0}")]
    Unavailable(String),

    /// Upstream did not answer in time (504)
    #[error("{0}")]
    Timeout(String),

    /// Upstream failure or unexpected error (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } | ApiError::UpstreamThrottled(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "invalid",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::UpstreamThrottled(_) => "upstream_throttled",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) => "error",
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

/// `X-RateLimit-*` headers describing `result`.
pub fn rate_limit_headers(result: &RateLimitResult) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(result.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(result.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(result.reset_epoch_secs()));
    headers
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ApiError::Validation(errors) => (
                status,
                Json(ErrorResponse {
                    success: false,
                    error: "Validation failed".to_string(),
                    details: Some(errors.0),
                }),
            )
                .into_response(),
            ApiError::RateLimited { result, message } => {
                let mut headers = rate_limit_headers(&result);
                headers.insert(
                    axum::http::header::RETRY_AFTER,
                    HeaderValue::from(result.retry_after_secs(now_ms())),
                );
                (
                    status,
                    headers,
                    Json(ErrorResponse {
                        success: false,
                        error: message,
                        details: None,
                    }),
                )
                    .into_response()
            }
            ApiError::Unauthorized(message)
            | ApiError::UpstreamThrottled(message)
            | ApiError::Unavailable(message)
            | ApiError::Timeout(message)
            | ApiError::Internal(message) => (
                status,
                Json(ErrorResponse {
                    success: false,
                    error: message,
                    details: None,
                }),
            )
                .into_response(),
        }
    }
}
