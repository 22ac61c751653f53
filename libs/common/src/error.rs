//! Custom error types for the common library
//!
//! Every fallible client operation reports a [`ClientError`]. None of them
//! is fatal: callers turn the error into a notice and carry on.

use serde_json::Value;
use thiserror::Error;

/// Custom error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Input rejected locally, before any request was sent
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or no authenticated session
    #[error("{0}")]
    Authentication(String),

    /// A lookup returned nothing usable
    #[error("{0}")]
    NotFound(String),

    /// A lookup returned something the workflow cannot accept
    #[error("{0}")]
    Conflict(String),

    /// The backend answered with a non-2xx status
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },

    /// The request never got an answer
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a body we could not read
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Build an error from a non-2xx response, pulling the most useful
    /// message out of the body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| format!("HTTP {}", status));
        ClientError::Http { status, message }
    }

    /// HTTP status of the failed response, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Type alias for Result with ClientError
pub type ClientResult<T> = Result<T, ClientError>;

fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => message_from_value(&value),
        // Plain-text answers are shown as-is unless they are an HTML error page
        Err(_) if !body.starts_with('<') && body.len() <= 200 => Some(body.to_string()),
        Err(_) => None,
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items.iter().filter_map(message_from_value).collect();
            (!messages.is_empty()).then(|| messages.join(" "))
        }
        Value::Object(map) => {
            if let Some(detail) = map.get("detail").and_then(message_from_value) {
                return Some(detail);
            }
            if let Some(errors) = map.get("non_field_errors").and_then(message_from_value) {
                return Some(errors);
            }
            if let Some(errors) = map.get("errors") {
                return message_from_value(errors);
            }

            let messages: Vec<String> = map
                .iter()
                .filter_map(|(field, v)| {
                    message_from_value(v).map(|m| {
                        if field == "__all__" {
                            m
                        } else {
                            format!("{}: {}", field, m)
                        }
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ClientError) -> String {
        match err {
            ClientError::Http { message, .. } => message,
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_detail_field_wins() {
        let err = ClientError::from_response(403, r#"{"detail": "Not allowed."}"#);
        assert_eq!(err.status(), Some(403));
        assert_eq!(message(err), "Not allowed.");
    }

    #[test]
    fn test_validation_error_list() {
        let err = ClientError::from_response(
            400,
            r#"["The room is already booked for that time."]"#,
        );
        assert_eq!(message(err), "The room is already booked for that time.");
    }

    #[test]
    fn test_field_errors_are_prefixed() {
        let err = ClientError::from_response(400, r#"{"name": ["This name is taken."]}"#);
        assert_eq!(message(err), "name: This name is taken.");
    }

    #[test]
    fn test_non_field_errors_are_not_prefixed() {
        let err = ClientError::from_response(
            400,
            r#"{"non_field_errors": ["Only band members can book."]}"#,
        );
        assert_eq!(message(err), "Only band members can book.");
    }

    #[test]
    fn test_login_form_errors() {
        let err = ClientError::from_response(
            400,
            r#"{"errors": {"__all__": ["Please enter a correct username and password."]}}"#,
        );
        assert_eq!(
            message(err),
            "Please enter a correct username and password."
        );
    }

    #[test]
    fn test_fallback_to_status() {
        let err = ClientError::from_response(502, "<html><body>Bad gateway</body></html>");
        assert_eq!(message(err), "HTTP 502");

        let err = ClientError::from_response(500, "");
        assert_eq!(message(err), "HTTP 500");
    }

    #[test]
    fn test_plain_text_body() {
        let err = ClientError::from_response(503, "maintenance");
        assert_eq!(err.to_string(), "Request failed (503): maintenance");
    }
}
