//! Errors answered to Discord as HTTP statuses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

/// Why an incoming request was refused.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// A signature header is absent or not valid ASCII.
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    /// The request was not signed by Discord.
    #[error("invalid request signature")]
    BadSignature,

    /// The configured application public key is malformed.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The signed body is not a payload we understand.
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl InteractionError {
    /// HTTP status returned for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingHeader(_) | Self::BadSignature => StatusCode::UNAUTHORIZED,
            Self::InvalidKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Payload(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for InteractionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = status.as_u16(), error = %self, "interaction request refused");
        (status, self.to_string()).into_response()
    }
}
