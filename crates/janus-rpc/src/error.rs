//! Error types for the janus-rpc crate.

use crate::protocol::{GatewayError, Id};
use crate::transport::TransportError;

/// Unified error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The gateway answered with a status other than 200.
    #[error("request failed: {0}")]
    Status(u16),

    /// The reply marker differs from the one the command expects.
    #[error("request failed: {received}{}", gateway_suffix(.gateway))]
    Marker {
        expected: String,
        received: String,
        gateway: Option<GatewayError>,
    },

    /// The reply does not echo the transaction of the request.
    #[error("request mismatch from janus")]
    TransactionMismatch,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("session not connected")]
    NotConnected,

    #[error("session already connected: {0}")]
    AlreadyConnected(Id),

    #[error("plugin not attached: {0}")]
    UnknownPlugin(String),

    #[error("response data has no id")]
    MissingId,
}

impl Error {
    #[must_use]
    pub fn marker(
        expected: impl Into<String>,
        received: impl Into<String>,
        gateway: Option<GatewayError>,
    ) -> Self {
        Self::Marker {
            expected: expected.into(),
            received: received.into(),
            gateway,
        }
    }
}

#[allow(clippy::ref_option)] // called with the field reference from the derive
fn gateway_suffix(gateway: &Option<GatewayError>) -> String {
    gateway
        .as_ref()
        .map(|e| format!(" ({e})"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
