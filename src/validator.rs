// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Request body validation and sanitization.
//!
//! Bodies arrive as arbitrary JSON. Each payload type implements [`Schema`],
//! which checks the raw value field by field and either builds the typed,
//! normalized payload or returns every field error found.
//!
//! - Text fields: presence, trimmed length bounds
//! - Email: shape check, lower-cased
//! - Chat role: fixed set of tags
//! - Free text relayed to the workflow webhooks is stripped of markup and
//!   script vectors

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));
static SCRIPT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script pattern")
});
static ANGLE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>]").expect("valid bracket pattern"));
static JAVASCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid uri pattern"));
static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon\w+\s*=").expect("valid handler pattern"));

const EMAIL_MAX: usize = 255;

/// A single field-scoped problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every field error found in one body, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", summary(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether any error is scoped to `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// A payload that can be checked and built from a raw JSON body.
pub trait Schema: Sized {
    fn validate(body: &Value) -> ValidationResult<Self>;
}

/// Parse raw bytes as JSON and validate them against `T`.
pub fn parse<T: Schema>(bytes: &[u8]) -> ValidationResult<T> {
    let body: Value = serde_json::from_slice(bytes).map_err(|e| {
        debug!(error = %e, "Request body is not valid JSON");
        ValidationErrors::single("body", "Request body must be valid JSON")
    })?;
    T::validate(&body)
}

/// Length bounds and presence for one text field.
#[derive(Debug, Clone, Copy)]
struct TextRule {
    field: &'static str,
    label: &'static str,
    required: bool,
    min: usize,
    max: usize,
}

impl TextRule {
    const fn required(field: &'static str, label: &'static str, min: usize, max: usize) -> Self {
        Self {
            field,
            label,
            required: true,
            min,
            max,
        }
    }

    const fn optional(field: &'static str, label: &'static str, max: usize) -> Self {
        Self {
            field,
            label,
            required: false,
            min: 0,
            max,
        }
    }
}

/// Collects errors while reading fields out of one JSON object.
struct Checker<'a> {
    body: &'a Map<String, Value>,
    prefix: String,
    errors: Vec<FieldError>,
}

impl<'a> Checker<'a> {
    fn new(body: &'a Value) -> Result<Self, ValidationErrors> {
        match body.as_object() {
            Some(body) => Ok(Self::scoped(body, String::new())),
            None => Err(ValidationErrors::single(
                "body",
                "Request body must be a JSON object",
            )),
        }
    }

    fn scoped(body: &'a Map<String, Value>, prefix: String) -> Self {
        Self {
            body,
            prefix,
            errors: Vec::new(),
        }
    }

    fn path(&self, field: &str) -> String {
        format!("{}{}", self.prefix, field)
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        let path = self.path(field);
        self.errors.push(FieldError::new(path, message));
    }

    /// Present, non-null value of a field.
    fn value(&self, field: &str) -> Option<&'a Value> {
        self.body.get(field).filter(|v| !v.is_null())
    }

    /// Trimmed string value, reporting a type error for non-strings.
    fn string(&mut self, field: &str, label: &str) -> Option<&'a str> {
        match self.value(field) {
            None => None,
            Some(Value::String(s)) => Some(s.trim()),
            Some(_) => {
                self.fail(field, format!("{label} must be a string"));
                None
            }
        }
    }

    /// Sanitized text field. The upper bound applies to the submitted text;
    /// presence and the lower bound apply to what is left after sanitizing.
    fn text(&mut self, rule: TextRule) -> Option<String> {
        let submitted = match self.string(rule.field, rule.label) {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.missing(rule);
                return None;
            }
        };

        if submitted.chars().count() > rule.max {
            self.fail(
                rule.field,
                format!("{} must be at most {} characters", rule.label, rule.max),
            );
            return None;
        }

        let value = sanitize(submitted);
        if value.is_empty() {
            self.missing(rule);
            None
        } else if value.chars().count() < rule.min {
            self.fail(
                rule.field,
                format!("{} must be at least {} characters", rule.label, rule.min),
            );
            None
        } else {
            Some(value)
        }
    }

    fn missing(&mut self, rule: TextRule) {
        if rule.required && !self.has_error(rule.field) {
            self.fail(rule.field, format!("{} is required", rule.label));
        }
    }

    fn email(&mut self, field: &str) -> Option<String> {
        let value = match self.string(field, "Email") {
            Some(v) if !v.is_empty() => v,
            _ => {
                if !self.has_error(field) {
                    self.fail(field, "Email is required");
                }
                return None;
            }
        };

        if value.chars().count() > EMAIL_MAX {
            self.fail(field, format!("Email must be at most {EMAIL_MAX} characters"));
            None
        } else if !EMAIL.is_match(value) {
            self.fail(field, "Invalid email format");
            None
        } else {
            Some(value.to_lowercase())
        }
    }

    fn has_error(&self, field: &str) -> bool {
        let path = self.path(field);
        self.errors.iter().any(|e| e.field == path)
    }

    fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> ValidationResult<T> {
        if self.errors.is_empty() {
            if let Some(value) = build() {
                return Ok(value);
            }
        }
        Err(ValidationErrors(self.errors))
    }
}

/// Remove markup and script vectors from free text.
///
/// Whole `<script>` elements go first, then stray angle brackets,
/// `javascript:` URIs and inline `on*=` handlers. The passes repeat until
/// nothing changes, so removing one match cannot splice a new one together
/// (`javajavascript:script:`). The result is trimmed; all other text is kept
/// as is.
pub fn sanitize(input: &str) -> String {
    let mut text = input.to_string();
    loop {
        let next = {
            let pass = SCRIPT_ELEMENT.replace_all(&text, "");
            let pass = ANGLE_BRACKETS.replace_all(&pass, "");
            let pass = JAVASCRIPT_URI.replace_all(&pass, "");
            EVENT_HANDLER.replace_all(&pass, "").into_owned()
        };
        if next == text {
            break;
        }
        text = next;
    }
    text.trim().to_string()
}

/// Contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub message: String,
}

impl Schema for ContactSubmission {
    fn validate(body: &Value) -> ValidationResult<Self> {
        let mut check = Checker::new(body)?;

        let name = check.text(TextRule::required("name", "Name", 2, 100));
        let email = check.email("email");
        let company = check.text(TextRule::optional("company", "Company name", 100));
        let phone = check.text(TextRule::optional("phone", "Phone", 30));
        let service = check.text(TextRule::optional("service", "Service", 100));
        let message = check.text(TextRule::required("message", "Message", 10, 5000));

        check.finish(|| {
            Some(ContactSubmission {
                name: name?,
                email: email?,
                company,
                phone,
                service,
                message: message?,
            })
        })
    }
}

/// Newsletter sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsletterSubscription {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Schema for NewsletterSubscription {
    fn validate(body: &Value) -> ValidationResult<Self> {
        let mut check = Checker::new(body)?;

        let email = check.email("email");
        let name = check.text(TextRule::optional("name", "Name", 100));

        check.finish(|| {
            Some(NewsletterSubscription {
                email: email?,
                name,
            })
        })
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// One turn of the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Chat widget request: the conversation so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

const CHAT_MAX_MESSAGES: usize = 10;
const CHAT_MAX_CONTENT: usize = 2000;

impl Schema for ChatRequest {
    fn validate(body: &Value) -> ValidationResult<Self> {
        let mut check = Checker::new(body)?;

        let items = match check.value("messages") {
            None => {
                check.fail("messages", "Messages are required");
                return check.finish(|| None);
            }
            Some(Value::Array(items)) => items,
            Some(_) => {
                check.fail("messages", "Messages must be an array");
                return check.finish(|| None);
            }
        };

        if items.is_empty() {
            check.fail("messages", "At least one message is required");
        } else if items.len() > CHAT_MAX_MESSAGES {
            check.fail(
                "messages",
                format!("At most {CHAT_MAX_MESSAGES} messages are allowed"),
            );
        }

        let mut messages = Vec::with_capacity(items.len());
        for (i, item) in items.iter().take(CHAT_MAX_MESSAGES).enumerate() {
            let prefix = format!("messages[{i}].");
            let Some(object) = item.as_object() else {
                check.fail(&format!("messages[{i}]"), "Message must be an object");
                continue;
            };

            let mut inner = Checker::scoped(object, prefix);
            let role = match inner.string("role", "Role") {
                Some(tag) => match Role::parse(tag) {
                    Some(role) => Some(role),
                    None => {
                        inner.fail("role", "Role must be one of: user, assistant, system");
                        None
                    }
                },
                None => {
                    if !inner.has_error("role") {
                        inner.fail("role", "Role is required");
                    }
                    None
                }
            };
            let content = match inner.value("content") {
                Some(Value::String(s)) if s.trim().is_empty() => {
                    inner.fail("content", "Content is required");
                    None
                }
                Some(Value::String(s)) if s.chars().count() > CHAT_MAX_CONTENT => {
                    inner.fail(
                        "content",
                        format!("Content must be at most {CHAT_MAX_CONTENT} characters"),
                    );
                    None
                }
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => {
                    inner.fail("content", "Content must be a string");
                    None
                }
                None => {
                    inner.fail("content", "Content is required");
                    None
                }
            };

            check.errors.append(&mut inner.errors);
            if let (Some(role), Some(content)) = (role, content) {
                messages.push(ChatMessage { role, content });
            }
        }

        check.finish(|| Some(ChatRequest { messages }))
    }
}
