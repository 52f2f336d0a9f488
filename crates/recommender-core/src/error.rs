//! ============================================================================
//! Error Types - API, configuration and input failures
//! ============================================================================
//! Every failure is terminal for the operation that raised it. Callers look
//! at `ApiError::disposition` to decide what to tell the user; nothing in
//! the crate retries on its own.
//! ============================================================================

use std::time::Duration;

/// Failure of a single call to the recommendation backend
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unauthorized (401): {0}")]
    Unauthorized(String),

    #[error("Forbidden (403): {0}")]
    Forbidden(String),

    #[error("Rate limited (429){}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

/// What the caller should do about an `ApiError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Back off; the server may have said for how long
    RetryLater(Option<Duration>),
    /// Credentials are missing or rejected; never retried silently
    Reauthenticate,
    /// Opaque failure, surfaced as-is
    Fail,
}

impl ApiError {
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            ApiError::RateLimited { retry_after } => ErrorDisposition::RetryLater(*retry_after),
            ApiError::Unauthorized(_) | ApiError::Forbidden(_) => ErrorDisposition::Reauthenticate,
            _ => ErrorDisposition::Fail,
        }
    }

    /// HTTP status behind the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Timeout(_) | ApiError::Transport(_))
    }
}

/// Configuration could not be resolved
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RECOMMENDER_API_URL must be set for production builds")]
    MissingProductionUrl,

    #[error("API URL '{0}' is a placeholder; point it at a real deployment")]
    PlaceholderUrl(String),

    #[error("Invalid API URL '{0}': must start with http:// or https://")]
    InvalidUrl(String),

    #[error("Unknown environment '{0}'. Valid values: development, production")]
    UnknownEnvironment(String),

    #[error("Unknown backend '{0}'. Valid values: http, mock")]
    UnknownBackend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_classification() {
        assert_eq!(
            ApiError::RateLimited {
                retry_after: Some(Duration::from_secs(30))
            }
            .disposition(),
            ErrorDisposition::RetryLater(Some(Duration::from_secs(30)))
        );
        assert_eq!(
            ApiError::Unauthorized("expired".into()).disposition(),
            ErrorDisposition::Reauthenticate
        );
        assert_eq!(
            ApiError::Forbidden("nope".into()).disposition(),
            ErrorDisposition::Reauthenticate
        );

        let opaque = [
            ApiError::Timeout(Duration::from_secs(10)),
            ApiError::Transport("connection refused".into()),
            ApiError::Status {
                status: 500,
                message: "boom".into(),
            },
            ApiError::Decode("eof".into()),
        ];
        for error in opaque {
            assert_eq!(
                error.disposition(),
                ErrorDisposition::Fail,
                "Expected Fail for: {}",
                error
            );
        }
    }

    #[test]
    fn test_rate_limit_message_includes_hint() {
        let with_hint = ApiError::RateLimited {
            retry_after: Some(Duration::from_secs(12)),
        };
        assert_eq!(with_hint.to_string(), "Rate limited (429), retry after 12s");

        let without = ApiError::RateLimited { retry_after: None };
        assert_eq!(without.to_string(), "Rate limited (429)");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Forbidden(String::new()).status(), Some(403));
        assert_eq!(ApiError::Transport("dns".into()).status(), None);
        assert!(ApiError::Timeout(Duration::from_secs(1)).is_transport());
    }
}
