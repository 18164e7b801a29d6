//! Typed failures from hosted APIs and the user-facing text for them.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure category for embedding and generation calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{service} request failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} rate limit exceeded: {body}")]
    RateLimited { service: &'static str, body: String },
    #[error("{service} rejected the credentials ({status}): {body}")]
    Auth {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("{service} response could not be decoded: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },
}

impl ApiError {
    /// Build the error for a non-success HTTP status.
    pub fn from_status(service: &'static str, status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { service, body },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth {
                service,
                status,
                body,
            },
            _ => ApiError::Status {
                service,
                status,
                body,
            },
        }
    }

    /// Rate limits, server errors and connection failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network { .. } | ApiError::RateLimited { .. } => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            ApiError::Auth { .. } | ApiError::Decode { .. } => false,
        }
    }

    pub fn decode(service: &'static str, reason: impl Into<String>) -> Self {
        ApiError::Decode {
            service,
            reason: reason.into(),
        }
    }
}

/// Wrap a base message with the standard escalation line.
pub fn build_error_message(base: &str) -> String {
    format!("{}\n\nPlease contact your administrator.", base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let e = ApiError::from_status("openai", StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(e, ApiError::RateLimited { .. }));
        assert!(e.is_transient());

        let e = ApiError::from_status("openai", StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(e, ApiError::Auth { .. }));
        assert!(!e.is_transient());

        let e = ApiError::from_status("openai", StatusCode::BAD_GATEWAY, String::new());
        assert!(e.is_transient());

        let e = ApiError::from_status("openai", StatusCode::BAD_REQUEST, String::new());
        assert!(!e.is_transient());
    }

    #[test]
    fn error_message_has_escalation_line() {
        let msg = build_error_message("Failed to get an answer");
        assert!(msg.starts_with("Failed to get an answer"));
        assert!(msg.ends_with("Please contact your administrator."));
    }
}
