// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the site gateway.
//!
//! Every API endpoint runs the same gate: identify the client, check the
//! endpoint's quota, validate the body, then relay it upstream.

use crate::client::client_identifier;
use crate::config::{Config, RateLimitConfig};
use crate::error::{rate_limit_headers, ApiError};
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::Metrics;
use crate::upstream::{CompletionClient, Delivery, UpstreamError, WebhookClient};
use crate::validator::{self, ChatRequest, ContactSubmission, NewsletterSubscription};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub webhooks: WebhookClient,
    pub completion: CompletionClient,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    /// Build the state from configuration with an in-memory limiter.
    pub fn from_config(config: Config) -> prometheus::Result<Self> {
        Self::with_limiter(config, RateLimiter::in_memory())
    }

    pub fn with_limiter(config: Config, limiter: RateLimiter) -> prometheus::Result<Self> {
        let client = reqwest::Client::new();
        Ok(Self {
            limiter,
            webhooks: WebhookClient::new(
                client.clone(),
                config.upstream.timeout(),
                config.environment,
            ),
            completion: CompletionClient::new(client, &config.upstream, config.environment),
            metrics: Metrics::new()?,
            config,
        })
    }

    fn support_hint(&self) -> String {
        format!("Please try again or email {} directly.", self.config.support_email)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Contact and newsletter success body.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
}

/// Chat success body.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
}

/// Contact payload as sent to the workflow webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactRelay<'a> {
    #[serde(flatten)]
    submission: &'a ContactSubmission,
    timestamp: String,
    user_agent: &'a str,
}

/// Newsletter payload as sent to the workflow webhook.
#[derive(Debug, Serialize)]
struct NewsletterRelay<'a> {
    #[serde(flatten)]
    subscription: &'a NewsletterSubscription,
    source: String,
    timestamp: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "site-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Count one request against `policy` for the caller.
async fn admit(
    state: &AppState,
    scope: &str,
    headers: &HeaderMap,
    policy: &RateLimitConfig,
) -> Result<RateLimitResult, ApiError> {
    let client = client_identifier(headers);
    let result = state
        .limiter
        .check(&format!("{scope}:{client}"), policy)
        .await;

    state
        .metrics
        .set_rate_limit_entries(state.limiter.tracked().await);

    if result.success {
        debug!(endpoint = scope, client = %client, remaining = result.remaining, "Request admitted");
        Ok(result)
    } else {
        info!(endpoint = scope, client = %client, reset = result.reset, "Request rate limited");
        Err(ApiError::RateLimited {
            result,
            message: "Too many requests. Please try again later.".to_string(),
        })
    }
}

/// Attach rate-limit headers and record the outcome.
fn finish(
    state: &AppState,
    endpoint: &'static str,
    quota: Option<&RateLimitResult>,
    outcome: Result<Response, ApiError>,
) -> Response {
    let label = match &outcome {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    state.metrics.record_request(endpoint, label);

    let mut response = outcome.unwrap_or_else(IntoResponse::into_response);
    if let Some(quota) = quota {
        response.headers_mut().extend(rate_limit_headers(quota));
    }
    response
}

/// Map a webhook failure to the response a form user sees.
fn webhook_failure(state: &AppState, subject: &str, action: &str, err: UpstreamError) -> ApiError {
    match err {
        UpstreamError::NotConfigured(_) => ApiError::Unavailable(format!(
            "{subject} is not configured. Please email {} directly.",
            state.config.support_email
        )),
        UpstreamError::Timeout(limit) => {
            warn!(subject, ?limit, "Webhook timed out");
            ApiError::Timeout(format!("Request timeout. {}", state.support_hint()))
        }
        other => {
            error!(subject, error = %other, "Webhook relay failed");
            ApiError::Internal(format!("Failed to {action}. {}", state.support_hint()))
        }
    }
}

/// Contact form submission.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let policy = state.config.rate_limit.contact;
    let quota = match admit(&state, "contact", &headers, &policy).await {
        Ok(quota) => quota,
        Err(e) => return finish(&state, "contact", None, Err(e)),
    };

    let outcome = submit_contact(&state, &headers, &body).await;
    finish(&state, "contact", Some(&quota), outcome)
}

async fn submit_contact(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, ApiError> {
    let submission: ContactSubmission = validator::parse(body).map_err(|e| {
        debug!(error = %e, "Contact form rejected");
        ApiError::from(e)
    })?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let relay = ContactRelay {
        submission: &submission,
        timestamp: chrono::Utc::now().to_rfc3339(),
        user_agent,
    };

    let started = Instant::now();
    let delivery = state
        .webhooks
        .relay(
            "contact webhook",
            state.config.upstream.contact_webhook_url.as_deref(),
            &relay,
        )
        .await;
    state.metrics.observe_upstream("contact webhook", started.elapsed());

    let message = match delivery {
        Ok(Delivery::Sent) => {
            info!(email = %submission.email, "Contact form relayed");
            "Thank you for contacting us! We'll get back to you soon."
        }
        Ok(Delivery::Simulated) => {
            info!(email = %submission.email, "Contact form received without webhook");
            "Form received (development mode - no webhook configured)"
        }
        Err(e) => return Err(webhook_failure(state, "Contact form", "submit form", e)),
    };

    Ok(Json(SubmitResponse {
        success: true,
        message: message.to_string(),
    })
    .into_response())
}

/// Newsletter subscription.
pub async fn newsletter(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let policy = state.config.rate_limit.newsletter;
    let quota = match admit(&state, "newsletter", &headers, &policy).await {
        Ok(quota) => quota,
        Err(e) => return finish(&state, "newsletter", None, Err(e)),
    };

    let outcome = subscribe(&state, &body).await;
    finish(&state, "newsletter", Some(&quota), outcome)
}

async fn subscribe(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let subscription: NewsletterSubscription = validator::parse(body)?;

    let relay = NewsletterRelay {
        subscription: &subscription,
        source: format!("{}-newsletter", state.config.upstream.site_name),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let started = Instant::now();
    let delivery = state
        .webhooks
        .relay(
            "newsletter webhook",
            state.config.upstream.newsletter_webhook_url.as_deref(),
            &relay,
        )
        .await;
    state.metrics.observe_upstream("newsletter webhook", started.elapsed());

    let message = match delivery {
        Ok(Delivery::Sent) => "Subscribed successfully",
        Ok(Delivery::Simulated) => "Subscribed (development mode - no webhook configured)",
        Err(e) => return Err(webhook_failure(state, "Newsletter signup", "subscribe", e)),
    };

    Ok(Json(SubmitResponse {
        success: true,
        message: message.to_string(),
    })
    .into_response())
}

/// Chat widget turn.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let policy = state.config.rate_limit.chat;
    let quota = match admit(&state, "chat", &headers, &policy).await {
        Ok(quota) => quota,
        Err(e) => return finish(&state, "chat", None, Err(e)),
    };

    let outcome = reply(&state, &body).await;
    finish(&state, "chat", Some(&quota), outcome)
}

async fn reply(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let request: ChatRequest = validator::parse(body)?;

    let started = Instant::now();
    let completion = state.completion.complete(&request.messages).await;
    state.metrics.observe_upstream("completion", started.elapsed());

    match completion {
        Ok(message) => Ok(Json(ChatResponse { message }).into_response()),
        Err(UpstreamError::NotConfigured(_)) => Err(ApiError::Unavailable(format!(
            "Chat is not available right now. Please email {} directly.",
            state.config.support_email
        ))),
        Err(UpstreamError::Status(status)) if status == StatusCode::UNAUTHORIZED => {
            error!("Completion API rejected the configured key");
            Err(ApiError::Unauthorized("Invalid API key".to_string()))
        }
        Err(UpstreamError::Status(status)) if status == StatusCode::TOO_MANY_REQUESTS => {
            warn!("Completion API throttled the gateway");
            Err(ApiError::UpstreamThrottled(
                "Rate limit exceeded. Please try again later.".to_string(),
            ))
        }
        Err(UpstreamError::Timeout(limit)) => {
            warn!(?limit, "Completion API timed out");
            Err(ApiError::Timeout(format!("Request timeout. {}", state.support_hint())))
        }
        Err(e) => {
            error!(error = %e, "Completion request failed");
            Err(ApiError::Internal(
                "Failed to process chat request".to_string(),
            ))
        }
    }
}
