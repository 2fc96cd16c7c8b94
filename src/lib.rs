// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Site Gateway
//!
//! API backend for the 143IT marketing site. Each endpoint runs the same
//! gate before anything leaves the process:
//!
//! - Per-client fixed-window rate limiting (contact 5/15min, newsletter
//!   3/15min, chat 10/min)
//! - Schema validation with complete field-level error reports
//! - Sanitization of free text relayed to workflow webhooks
//! - Bounded, single-attempt relay to the webhook or completion API

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod server;
pub mod upstream;
pub mod validator;

pub use config::{Config, Environment, RateLimitConfig};
pub use error::ApiError;
pub use handlers::AppState;
pub use limiter::{MemoryStore, RateLimitResult, RateLimitStore, RateLimiter};
pub use validator::{Schema, ValidationErrors, ValidationResult};
