//! Request bodies and the response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every response: `{status, message, data?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
            data: serde_json::to_value(data).ok(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub session_id: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionsQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeConnectionsRequest {
    pub session_id: Option<String>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ProfilesRequest {
    pub session_id: Option<String>,
    pub profile_urls: Option<Vec<String>>,
}

/// Non-empty string or `None`.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
