//! Discord HTTP interactions endpoint.
//!
//! Discord POSTs slash command invocations to `/interactions` and app
//! lifecycle events to `/events`. Both are signed with the application key.
//! Registration is answered inline; on-demand checks are deferred and the
//! answer is edited in once the source has replied.

/// Error type answered as HTTP status.
pub mod error;
/// Deferred answer delivery.
pub mod followup;
/// Wire types and command mapping.
pub mod payload;
/// Axum routes.
pub mod routes;
/// Request signature verification.
pub mod signature;

use std::io;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::InteractionError;
pub use followup::{DiscordFollowup, FollowupPort};
pub use routes::{InteractionState, build_router};
pub use signature::SignatureVerifier;

/// Serve the interaction routes on `listener` until `cancel` fires.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(
    listener: TcpListener,
    state: InteractionState,
    cancel: CancellationToken,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "interactions endpoint listening");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
