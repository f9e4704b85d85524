//! Remote store error types.

use serde_json::Value;

/// Label used when an error carries nothing printable.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Errors returned by a [`RemoteStore`](super::RemoteStore) call.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Structured error reported by the storage API
    Api {
        message: String,
        details: Option<String>,
        hint: Option<String>,
        code: Option<String>,
    },
    /// Plain string error
    Message(String),
    /// Request never produced a response
    Transport(String),
    /// Local database failure
    Database(String),
    /// Row could not be encoded or decoded
    Codec(String),
    /// Error payload of an unrecognized shape
    Unknown(Value),
}

fn text_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl RemoteError {
    /// Classifies an error payload returned by the storage API.
    pub fn from_payload(payload: Value) -> Self {
        if let Value::Object(obj) = &payload {
            let message = text_field(obj, "message")
                .or_else(|| text_field(obj, "error_description"))
                .or_else(|| text_field(obj, "error"));
            let details = text_field(obj, "details");
            let hint = text_field(obj, "hint");
            if message.is_some() || details.is_some() || hint.is_some() {
                return RemoteError::Api {
                    message: message.unwrap_or_default(),
                    details,
                    hint,
                    code: text_field(obj, "code"),
                };
            }
        }

        match payload {
            Value::String(s) => RemoteError::Message(s),
            other => RemoteError::Unknown(other),
        }
    }

    /// Message suitable for an end-user notification.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Api {
                message,
                details,
                hint,
                ..
            } => {
                let parts: Vec<&str> = [Some(message.as_str()), details.as_deref(), hint.as_deref()]
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect();
                if parts.is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    parts.join(" | ")
                }
            }
            RemoteError::Message(s)
            | RemoteError::Transport(s)
            | RemoteError::Database(s)
            | RemoteError::Codec(s) => {
                if s.is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    s.clone()
                }
            }
            RemoteError::Unknown(Value::Null) => UNKNOWN_ERROR.to_string(),
            RemoteError::Unknown(value) => {
                serde_json::to_string(value).unwrap_or_else(|_| UNKNOWN_ERROR.to_string())
            }
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::Api { .. } | RemoteError::Message(_) | RemoteError::Unknown(_) => {
                write!(f, "Remote error: {}", self.user_message())
            }
            RemoteError::Transport(e) => write!(f, "Transport error: {}", e),
            RemoteError::Database(e) => write!(f, "Database error: {}", e),
            RemoteError::Codec(e) => write!(f, "Row codec error: {}", e),
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<sqlx::Error> for RemoteError {
    fn from(e: sqlx::Error) -> Self {
        RemoteError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Codec(e.to_string())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}
