// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Router assembly and background tasks.

use crate::config::Config;
use crate::error::ErrorResponse;
use crate::handlers::{self, AppState};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/api/contact", post(handlers::contact))
        .route("/api/newsletter", post(handlers::newsletter))
        .route("/api/chat", post(handlers::chat));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(handlers::metrics));
    }

    layered(app, &state.config).with_state(state)
}

/// Wrap routes in the CORS, trace and panic layers.
///
/// CORS preflight (`OPTIONS`) is answered by the CORS layer itself and never
/// reaches a route.
fn layered(app: Router<Arc<AppState>>, config: &Config) -> Router<Arc<AppState>> {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let support_email = config.support_email.clone();
    let on_panic = move |_: Box<dyn Any + Send + 'static>| -> Response {
        error!("Handler panicked");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                success: false,
                error: format!(
                    "Something went wrong. Please try again or email {support_email} directly."
                ),
                details: None,
            }),
        )
            .into_response()
    };

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(on_panic))
}

/// Periodically drop expired rate-limit entries.
pub fn spawn_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state.config.rate_limit.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = state.limiter.sweep().await;
            let tracked = state.limiter.tracked().await;
            state.metrics.set_rate_limit_entries(tracked);
            debug!(removed, tracked, "Swept rate limit entries");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, RateLimitConfig};
    use crate::limiter::now_ms;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        let config = Config {
            environment: Environment::Development,
            ..Default::default()
        };
        Arc::new(AppState::from_config(config).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_drops_expired_entries_and_updates_gauge() {
        let state = state();
        let window = RateLimitConfig::new(5, 60_000);

        // Opened an hour ago, long expired by the wall clock
        state
            .limiter
            .check_at("contact:10.0.0.1", &window, now_ms() - 3_600_000)
            .await;
        state
            .limiter
            .check_at("contact:10.0.0.2", &window, now_ms() - 3_600_000)
            .await;
        // Still open
        state
            .limiter
            .check("contact:10.0.0.3", &RateLimitConfig::new(5, 3_600_000))
            .await;
        assert_eq!(state.limiter.tracked().await, 3);

        let sweeper = spawn_sweeper(state.clone());
        let period = state.config.rate_limit.sweep_interval();
        tokio::time::sleep(period + Duration::from_secs(1)).await;

        assert_eq!(state.limiter.tracked().await, 1);
        let text = state.metrics.render().unwrap();
        assert!(text.contains("site_gateway_rate_limit_entries 1"));

        sweeper.abort();
    }

    #[tokio::test]
    async fn test_panicking_handler_returns_generic_error() {
        async fn boom() -> &'static str {
            panic!("handler failure")
        }

        let state = state();
        let routes: Router<Arc<AppState>> = Router::new().route("/boom", get(boom));
        let app = layered(routes, &state.config).with_state(state.clone());

        let request = Request::builder().uri("/boom").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains(&state.config.support_email));
        assert!(!message.contains("handler failure"));
    }
}
