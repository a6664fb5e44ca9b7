use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::auth::{AuthUser, Role};

/// SessionInfo
///
/// What the front-end needs to know about the visitor's access token, as resolved by
/// the gateway. An absent, malformed or expired token reports `authenticated: false`
/// with every other field empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub subject: Option<String>,
    pub role: Option<Role>,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionInfo {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            subject: None,
            role: None,
            expires_at: None,
        }
    }
}

impl From<Option<AuthUser>> for SessionInfo {
    fn from(user: Option<AuthUser>) -> Self {
        match user {
            Some(user) => Self {
                authenticated: true,
                expires_at: DateTime::from_timestamp(user.expires_at, 0),
                subject: Some(user.id),
                role: Some(user.role),
            },
            None => Self::anonymous(),
        }
    }
}

/// HealthResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Whether access tokens are signature-verified (false means decode-only).
    pub verifies_signatures: bool,
}
