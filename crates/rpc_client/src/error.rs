//! RPC client error types.

use thiserror::Error;

/// Errors raised while building a channel.
///
/// Call failures are never wrapped in this type; they surface as the
/// backend's `tonic::Status`.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The configured address is not a valid URI.
    #[error("invalid address for {service}: {address}")]
    InvalidAddress {
        service: String,
        address: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// The transport could not be established.
    #[error("failed to connect to {service} at {address}: {source}")]
    Connect {
        service: String,
        address: String,
        #[source]
        source: tonic::transport::Error,
    },

    /// The transport did not come up within the connect timeout.
    #[error("timed out connecting to {service} at {address}")]
    ConnectTimeout { service: String, address: String },
}

/// Result type for channel construction.
pub type Result<T> = std::result::Result<T, RpcError>;
