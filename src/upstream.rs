// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound calls: workflow webhooks and the chat-completion API.
//!
//! Each call is a single attempt bounded by the configured timeout. When the
//! destination is not configured, development mode simulates success without
//! touching the network and production mode reports
//! [`UpstreamError::NotConfigured`].

use crate::config::{Environment, UpstreamConfig};
use crate::validator::{ChatMessage, Role};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reply used when the completion API returns no text.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't generate a response. Please try again.";

/// Reply used in development mode when no API key is configured.
pub const SIMULATED_REPLY: &str =
    "The assistant is running in development mode without a completion API key.";

/// Prepended to every chat history.
pub const SYSTEM_PROMPT: &str = "You are the website assistant for 143IT, a remote-first managed \
service provider serving the USA and Canada. 143IT offers managed IT services with 24/7 \
monitoring and help desk support, cloud modernization on Azure and AWS including cost \
optimization, automation and DevOps (infrastructure as code, CI/CD, GitOps, n8n workflows), AI \
integration, and security and compliance (SOC, IAM, SOC2, HIPAA, zero trust).

Answer questions about these services accurately, help with general technical questions, and \
qualify leads by asking about their current infrastructure, cloud plans, automation needs, \
compliance requirements and team size. Be professional, approachable and solution-focused. \
Send urgent or complex issues to the human team at support@143it.com or +1 (720) 292-6098.";

/// Failure of an outbound call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Upstream did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Upstream returned status {0}")]
    Status(StatusCode),

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// How a relay completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Payload accepted by the upstream
    Sent,
    /// No upstream configured; nothing was sent
    Simulated,
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| UpstreamError::Timeout(limit))?
}

/// Relays payloads to workflow-automation webhooks.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    timeout: Duration,
    environment: Environment,
}

impl WebhookClient {
    pub fn new(client: reqwest::Client, timeout: Duration, environment: Environment) -> Self {
        Self {
            client,
            timeout,
            environment,
        }
    }

    /// POST `payload` as JSON to `url`.
    ///
    /// `target` names the webhook in logs and errors.
    pub async fn relay<T>(
        &self,
        target: &'static str,
        url: Option<&str>,
        payload: &T,
    ) -> Result<Delivery, UpstreamError>
    where
        T: Serialize + ?Sized,
    {
        let Some(url) = url else {
            if self.environment.is_development() {
                info!(target_name = target, "Webhook not configured, simulating delivery");
                return Ok(Delivery::Simulated);
            }
            warn!(target_name = target, "Webhook not configured");
            return Err(UpstreamError::NotConfigured(target));
        };

        debug!(target_name = target, "Relaying payload to webhook");
        bounded(self.timeout, async {
            let response = self.client.post(url).json(payload).send().await?;
            let status = response.status();
            if status.is_success() {
                Ok(Delivery::Sent)
            } else {
                Err(UpstreamError::Status(status))
            }
        })
        .await
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    environment: Environment,
}

impl CompletionClient {
    pub fn new(client: reqwest::Client, config: &UpstreamConfig, environment: Environment) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                config.completion_base_url.trim_end_matches('/')
            ),
            api_key: config.completion_api_key.clone(),
            model: config.completion_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
            environment,
        }
    }

    /// Generate the assistant's next reply for `history`.
    pub async fn complete(&self, history: &[ChatMessage]) -> Result<String, UpstreamError> {
        let Some(api_key) = self.api_key.as_deref() else {
            if self.environment.is_development() {
                info!("Completion API key not configured, simulating reply");
                return Ok(SIMULATED_REPLY.to_string());
            }
            warn!("Completion API key not configured");
            return Err(UpstreamError::NotConfigured("completion API"));
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: Role::System,
            content: SYSTEM_PROMPT.to_string(),
        });
        messages.extend_from_slice(history);

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(model = %self.model, turns = history.len(), "Requesting completion");
        bounded(self.timeout, async {
            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status(status));
            }

            let body: CompletionResponse = response.json().await?;
            Ok(body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .and_then(|m| m.content)
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_REPLY.to_string()))
        })
        .await
    }
}
