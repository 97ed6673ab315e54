//! Error type for backend requests

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend request.
///
/// Cloneable so one coalesced fetch result can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{target} responded with HTTP {status}")]
    Status { target: String, status: StatusCode },

    #[error("request to {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: Arc<reqwest::Error>,
    },

    #[error("malformed response from {target}: {source}")]
    Decode {
        target: String,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("cannot encode request body for {target}: {source}")]
    Encode {
        target: String,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub(crate) fn transport(target: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            target: target.to_string(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn decode(target: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            target: target.to_string(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn encode(target: &str, source: serde_json::Error) -> Self {
        Self::Encode {
            target: target.to_string(),
            source: Arc::new(source),
        }
    }

    /// The endpoint that failed, when known
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Status { target, .. }
            | Self::Transport { target, .. }
            | Self::Decode { target, .. }
            | Self::Encode { target, .. } => Some(target),
            Self::InvalidRequest(_) => None,
        }
    }

    /// HTTP status of a non-success response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_names_target() {
        let err = ApiError::Status {
            target: "http://localhost/api/kr/signals".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };

        assert!(err.to_string().contains("/api/kr/signals"));
        assert!(err.to_string().contains("500"));
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_decode_error_is_cloneable() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ApiError::decode("themes", source);
        let copy = err.clone();

        assert_eq!(copy.target(), Some("themes"));
        assert!(matches!(copy, ApiError::Decode { .. }));
    }
}
