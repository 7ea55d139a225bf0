//! Traits describing the external collaborators and their shared error type.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{DestinationId, Item};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to a source or a notifier backend.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The response could not be parsed into items.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The remote side answered with a non-success status.
    #[error("Rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
    /// Internal adapter error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// A content source that lists the items currently visible.
///
/// Implementations enforce their own request timeout; the loop never waits
/// on a source without bound.
pub trait SourcePort: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Return the items currently published, in the order they should be announced.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the source cannot be reached or parsed.
    async fn fetch(&self) -> Result<Vec<Item>, PortError>;
}

#[async_trait]
/// Delivers one message to one destination.
pub trait NotifierPort: Send + Sync {
    /// Send `text` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the platform rejects or cannot receive the message.
    async fn send(&self, destination: &DestinationId, text: &str) -> Result<(), PortError>;
}
