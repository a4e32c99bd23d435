//! Silent push delivery to the wallet vendor's gateway.

pub mod apns;

use async_trait::async_trait;
use thiserror::Error;

use glowpass_core::{PassTypeId, PushToken};

pub use apns::ApnsClient;

/// Errors from push delivery.
#[derive(Debug, Error)]
pub enum PushError {
    /// The gateway rejected the token itself. Terminal for this token; a
    /// re-register with a fresh token is the only cure.
    #[error("push gateway rejected token: {reason}")]
    InvalidToken { reason: String },

    /// Any other gateway-side failure.
    #[error("push gateway error ({status}): {reason}")]
    Gateway { status: u16, reason: String },

    /// Transport-level failure (includes the send timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Client certificate/key material could not be loaded.
    #[error("failed to load push credentials: {0}")]
    Credentials(String),
}

/// Sends silent (content-available) pushes.
///
/// A trait seam so the dispatcher can be exercised without a network; the
/// production implementation is [`ApnsClient`].
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Send one silent push to `token` for the pass-type `topic`.
    async fn send_silent(&self, token: &PushToken, topic: &PassTypeId) -> Result<(), PushError>;
}
