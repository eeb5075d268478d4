//! Status-code policy and envelope normalization
//!
//! Every transport outcome ends up here. A 2xx body is passed through or
//! wrapped; anything else is classified by status into a [`StatusPolicy`] that
//! decides the envelope message and which [`Notice`]s the user sees.

use crate::notify::Notice;
use naturalize_core::ApiResponse;
use naturalize_core::types::{ResponseMeta, now_timestamp};
use serde_json::Value;

/// Envelope message when no response arrived
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Notice shown when no response arrived
pub const NETWORK_ERROR_NOTICE: &str =
    "Network error occurred. Please check your internet connection.";

/// Message used when a failure body has no message
pub const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong.";

/// Notice shown on 401
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

/// Notice shown on 403
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to perform this action.";

/// Notice shown on 404
pub const NOT_FOUND_MESSAGE: &str = "Data not found.";

/// Notice shown on 429
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment.";

/// Notice shown on 500, 502 and 503
pub const SERVER_ERROR_MESSAGE: &str = "Server error occurred. Please try again later.";

/// Envelope message of a cancelled call
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

/// How a failed status is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusPolicy {
    /// 400: show the server's message
    BadRequest,
    /// 401: session expired, credentials are dropped
    Unauthorized,
    /// 403: fixed permission message
    Forbidden,
    /// 404: fixed not-found message
    NotFound,
    /// 422: one notice per validation error, or the `detail` field
    Validation,
    /// 429: fixed rate-limit message
    RateLimited,
    /// 500, 502, 503: fixed server-error message
    ServerError,
    /// Anything else: server message or generic fallback
    Other,
}

impl StatusPolicy {
    /// Classify a non-2xx status
    #[must_use]
    pub const fn classify(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            422 => Self::Validation,
            429 => Self::RateLimited,
            500 | 502 | 503 => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Notices to raise for a failure body
    #[must_use]
    pub fn notices(self, body: &Value, message: &str) -> Vec<Notice> {
        match self {
            Self::BadRequest | Self::Other => vec![Notice::error(message)],
            Self::Unauthorized => vec![Notice::error(SESSION_EXPIRED_MESSAGE)],
            Self::Forbidden => vec![Notice::error(PERMISSION_DENIED_MESSAGE)],
            Self::NotFound => vec![Notice::error(NOT_FOUND_MESSAGE)],
            Self::RateLimited => vec![Notice::error(RATE_LIMITED_MESSAGE)],
            Self::ServerError => vec![Notice::error(SERVER_ERROR_MESSAGE)],
            Self::Validation => validation_notices(body),
        }
    }
}

/// Whether a failed attempt is worth repeating
#[must_use]
pub const fn is_transient(status: u16) -> bool {
    matches!(status, 408 | 429) || status >= 500
}

/// Normalize a 2xx body into an envelope
///
/// A JSON object that already carries `success` is the server's own envelope
/// and is read field by field, never wrapped. Anything else is wrapped. Non-JSON text bodies are
/// wrapped as a string.
#[must_use]
pub fn normalize_success(status: u16, body: &[u8]) -> ApiResponse {
    let value = parse_body(body);

    let envelope = match value.as_object() {
        Some(map) if map.contains_key("success") => own_envelope(map),
        _ => ApiResponse::wrap(value),
    };
    envelope.with_status(status)
}

/// Read the server's own envelope field by field
///
/// A field of the wrong type falls back to its empty value; a `success` that is
/// not a boolean counts as a failure.
fn own_envelope(map: &serde_json::Map<String, Value>) -> ApiResponse {
    let present = |key: &str| map.get(key).filter(|v| !v.is_null()).cloned();
    ApiResponse {
        success: map.get("success").and_then(Value::as_bool).unwrap_or(false),
        data: present("data"),
        message: map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        errors: present("errors"),
        timestamp: map
            .get("timestamp")
            .and_then(Value::as_str)
            .map_or_else(now_timestamp, str::to_string),
        meta: ResponseMeta::default(),
    }
}

/// Normalize a non-2xx response into an envelope and the notices to raise
#[must_use]
pub fn normalize_failure(status: u16, body: &[u8]) -> (ApiResponse, Vec<Notice>) {
    let value = parse_body(body);
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(FALLBACK_ERROR_MESSAGE)
        .to_string();
    let errors = value.get("errors").filter(|e| !e.is_null()).cloned();

    let notices = StatusPolicy::classify(status).notices(&value, &message);
    let envelope = ApiResponse::failure(message, errors).with_status(status);
    (envelope, notices)
}

/// Envelope for a call that got no response at all
#[must_use]
pub fn network_failure() -> ApiResponse {
    let mut envelope = ApiResponse::failure(NETWORK_ERROR_MESSAGE, None);
    envelope.meta.network_error = true;
    envelope
}

/// Envelope for a call the caller cancelled
#[must_use]
pub fn cancelled() -> ApiResponse {
    let mut envelope = ApiResponse::failure(CANCELLED_MESSAGE, None);
    envelope.meta.cancelled = true;
    envelope
}

fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn validation_notices(body: &Value) -> Vec<Notice> {
    match body.get("errors") {
        Some(Value::Object(fields)) => fields
            .values()
            .filter_map(first_message)
            .map(Notice::error)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(first_message)
            .map(Notice::error)
            .collect(),
        _ => body
            .get("detail")
            .and_then(detail_message)
            .map(Notice::error)
            .into_iter()
            .collect(),
    }
}

// A field error is either a message or a list whose first entry is shown.
fn first_message(error: &Value) -> Option<String> {
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(first_message),
        Value::Object(map) => map
            .get("msg")
            .or_else(|| map.get("message"))
            .and_then(first_message),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

// FastAPI reports validation failures as `detail: [{loc, msg, type}]`.
fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(first_message)
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        other => first_message(other),
    }
}
