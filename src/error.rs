use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::upstream::MAX_FORWARD_BODY_BYTES;

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment cannot produce a usable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingInProduction(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// GatewayError
///
/// Failures while forwarding an allowed request to the page layer.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("request body could not be read: {0}")]
    Body(String),
}

impl From<BytesRejection> for GatewayError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::BodyTooLarge {
                limit: MAX_FORWARD_BODY_BYTES,
            }
        } else {
            GatewayError::Body(rejection.body_text())
        }
    }
}

/// ErrorBody
///
/// JSON shape returned to clients. Internal details stay in the logs.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: &'static str,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream(_) | GatewayError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        match self.status() {
            StatusCode::GATEWAY_TIMEOUT => ErrorBody {
                code: "upstream_timeout",
                message: "The page service did not respond in time.",
            },
            StatusCode::PAYLOAD_TOO_LARGE => ErrorBody {
                code: "payload_too_large",
                message: "The request body is too large.",
            },
            StatusCode::BAD_REQUEST => ErrorBody {
                code: "bad_request",
                message: "The request body could not be read.",
            },
            _ => ErrorBody {
                code: "upstream_unavailable",
                message: "The page service is unavailable.",
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::warn!(error = %self, "rejected request body");
        } else {
            tracing::error!(error = %self, "upstream forwarding failed");
        }
        (status, Json(self.body())).into_response()
    }
}
