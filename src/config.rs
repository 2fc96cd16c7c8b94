// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the site gateway.
//!
//! Values come from the process environment. Every setting has a default,
//! so an empty environment yields a production-mode gateway with no
//! upstreams configured.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Deployment mode. Decides how missing upstream configuration is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Missing webhooks and API keys are simulated as successes
    Development,
    /// Missing webhooks and API keys surface as 503
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(()),
        }
    }
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Deployment mode (default: production)
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Per-endpoint rate limits
    #[serde(default)]
    pub rate_limit: RateLimitPolicies,

    /// Webhook and completion API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Origins allowed by the CORS layer
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Human fallback contact surfaced in error messages
    #[serde(default = "default_support_email")]
    pub support_email: String,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// A fixed-window quota: at most `limit` requests per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub const fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }
}

/// Rate limits for each endpoint, plus the sweep period shared by all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicies {
    /// Contact form (default: 5 per 15 minutes)
    #[serde(default = "default_contact_limit")]
    pub contact: RateLimitConfig,

    /// Newsletter sign-up (default: 3 per 15 minutes)
    #[serde(default = "default_newsletter_limit")]
    pub newsletter: RateLimitConfig,

    /// Chat widget (default: 10 per minute)
    #[serde(default = "default_chat_limit")]
    pub chat: RateLimitConfig,

    /// How often expired entries are swept, in seconds (default: 300)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Settings for the outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Workflow webhook receiving contact submissions
    #[serde(default)]
    pub contact_webhook_url: Option<String>,

    /// Workflow webhook receiving newsletter subscriptions
    #[serde(default)]
    pub newsletter_webhook_url: Option<String>,

    /// Completion API key
    #[serde(default, skip_serializing)]
    pub completion_api_key: Option<String>,

    /// Completion API base URL (default: https://api.openai.com/v1)
    #[serde(default = "default_completion_base_url")]
    pub completion_base_url: String,

    /// Completion model name
    #[serde(default = "default_completion_model")]
    pub completion_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout applied to every outbound call in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Tag used as the newsletter `source` prefix
    #[serde(default = "default_site_name")]
    pub site_name: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_environment() -> Environment {
    Environment::Production
}

fn default_contact_limit() -> RateLimitConfig {
    RateLimitConfig::new(5, 15 * 60 * 1000)
}

fn default_newsletter_limit() -> RateLimitConfig {
    RateLimitConfig::new(3, 15 * 60 * 1000)
}

fn default_chat_limit() -> RateLimitConfig {
    RateLimitConfig::new(10, 60 * 1000)
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_completion_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_site_name() -> String {
    "143it-website".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["https://localhost".to_string()]
}

fn default_support_email() -> String {
    "support@143it.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            environment: default_environment(),
            rate_limit: RateLimitPolicies::default(),
            upstream: UpstreamConfig::default(),
            allowed_origins: default_allowed_origins(),
            support_email: default_support_email(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            contact: default_contact_limit(),
            newsletter: default_newsletter_limit(),
            chat: default_chat_limit(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            contact_webhook_url: None,
            newsletter_webhook_url: None,
            completion_api_key: None,
            completion_base_url: default_completion_base_url(),
            completion_model: default_completion_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
            site_name: default_site_name(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl UpstreamConfig {
    /// Get the outbound call timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RateLimitPolicies {
    /// Get the sweep period
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")) {
            Some(raw) => raw.parse().map_err(|()| ConfigError::Invalid {
                key: "APP_ENV",
                value: raw,
            })?,
            None => defaults.environment,
        };

        let rate_limit = RateLimitPolicies {
            contact: RateLimitConfig {
                limit: parse_or(&get, "CONTACT_RATE_LIMIT", defaults.rate_limit.contact.limit)?,
                window_ms: parse_or(
                    &get,
                    "CONTACT_RATE_WINDOW_MS",
                    defaults.rate_limit.contact.window_ms,
                )?,
            },
            newsletter: RateLimitConfig {
                limit: parse_or(
                    &get,
                    "NEWSLETTER_RATE_LIMIT",
                    defaults.rate_limit.newsletter.limit,
                )?,
                window_ms: parse_or(
                    &get,
                    "NEWSLETTER_RATE_WINDOW_MS",
                    defaults.rate_limit.newsletter.window_ms,
                )?,
            },
            chat: RateLimitConfig {
                limit: parse_or(&get, "CHAT_RATE_LIMIT", defaults.rate_limit.chat.limit)?,
                window_ms: parse_or(
                    &get,
                    "CHAT_RATE_WINDOW_MS",
                    defaults.rate_limit.chat.window_ms,
                )?,
            },
            sweep_interval_secs: parse_or(
                &get,
                "SWEEP_INTERVAL_SECS",
                defaults.rate_limit.sweep_interval_secs,
            )?,
        };

        let upstream = UpstreamConfig {
            contact_webhook_url: get("N8N_CONTACT_WEBHOOK_URL"),
            newsletter_webhook_url: get("N8N_NEWSLETTER_WEBHOOK"),
            completion_api_key: get("OPENAI_API_KEY"),
            completion_base_url: get("OPENAI_BASE_URL")
                .unwrap_or(defaults.upstream.completion_base_url),
            completion_model: get("OPENAI_MODEL").unwrap_or(defaults.upstream.completion_model),
            timeout_ms: parse_or(&get, "UPSTREAM_TIMEOUT_MS", defaults.upstream.timeout_ms)?,
            site_name: get("SITE_NAME").unwrap_or(defaults.upstream.site_name),
            ..defaults.upstream
        };

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.allowed_origins,
        };

        Ok(Config {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            environment,
            rate_limit,
            upstream,
            allowed_origins,
            support_email: get("SUPPORT_EMAIL").unwrap_or(defaults.support_email),
            metrics: MetricsConfig {
                enabled: parse_or(&get, "METRICS_ENABLED", defaults.metrics.enabled)?,
                ..defaults.metrics
            },
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.rate_limit.contact, RateLimitConfig::new(5, 900_000));
        assert_eq!(config.rate_limit.newsletter, RateLimitConfig::new(3, 900_000));
        assert_eq!(config.rate_limit.chat, RateLimitConfig::new(10, 60_000));
        assert_eq!(config.upstream.timeout(), Duration::from_secs(10));
        assert!(config.upstream.contact_webhook_url.is_none());
        assert!(config.upstream.completion_api_key.is_none());
    }

    #[test]
    fn test_node_env_selects_development() {
        let config = Config::from_lookup(lookup(&[("NODE_ENV", "development")])).unwrap();
        assert!(config.environment.is_development());

        // APP_ENV wins over NODE_ENV
        let config = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("NODE_ENV", "development"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = Config::from_lookup(lookup(&[
            ("N8N_CONTACT_WEBHOOK_URL", "https://hooks.example.com/contact"),
            ("N8N_NEWSLETTER_WEBHOOK", "   "),
            ("CHAT_RATE_LIMIT", "20"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .unwrap();

        assert_eq!(
            config.upstream.contact_webhook_url.as_deref(),
            Some("https://hooks.example.com/contact")
        );
        assert!(config.upstream.newsletter_webhook_url.is_none());
        assert_eq!(config.rate_limit.chat.limit, 20);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[("UPSTREAM_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { key: "UPSTREAM_TIMEOUT_MS", .. }
        ));
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("APP_ENV", "staging")])).is_err());
    }
}
