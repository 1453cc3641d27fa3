// src/connectors/error.rs
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The exchange answered with a non-success status and an error body.
    #[error("status: {status}, error code: {code}, error message: {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build request: {0}")]
    Request(String),
}

impl GatewayError {
    pub fn api(status: u16, code: i64, message: impl Into<String>) -> Self {
        GatewayError::Api {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            GatewayError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            GatewayError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// 429 is a request-weight breach, 418 an IP ban that follows repeated 429s.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.status(), Some(429) | Some(418))
    }
}

impl From<serde_urlencoded::ser::Error> for GatewayError {
    fn from(e: serde_urlencoded::ser::Error) -> Self {
        GatewayError::Request(e.to_string())
    }
}
