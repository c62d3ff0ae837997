//! Gateway error types.

use axum::http::StatusCode;
use thiserror::Error;

/// Gateway error type.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Broker topology could not be declared; the consumer cannot run.
    #[error("Topology error: {0:#}")]
    Topology(anyhow::Error),

    /// Broker connection or consumer setup error.
    #[error("Broker error: {0:#}")]
    Broker(anyhow::Error),

    /// Backend dial failure.
    #[error("RPC client error: {0}")]
    Rpc(#[from] rpc_client::RpcError),

    /// Backend call failure, passed through unchanged.
    #[error("RPC status: {0}")]
    Status(#[from] tonic::Status),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics exporter could not be installed.
    #[error("Metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// Connection's outbound queue is full or closed.
    #[error("Channel send error")]
    ChannelSend,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Map a backend status code to the HTTP status and message shown to clients.
pub fn http_status_for(code: tonic::Code) -> (StatusCode, &'static str) {
    use tonic::Code;

    match code {
        Code::Unauthenticated => (StatusCode::UNAUTHORIZED, "invalid credentials"),
        Code::AlreadyExists => (StatusCode::BAD_REQUEST, "already exists"),
        Code::NotFound => (StatusCode::NOT_FOUND, "not found"),
        Code::PermissionDenied => (StatusCode::FORBIDDEN, "permission denied"),
        Code::Cancelled => (StatusCode::REQUEST_TIMEOUT, "request canceled"),
        Code::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "deadline exceeded"),
        Code::InvalidArgument => (StatusCode::BAD_REQUEST, "invalid request"),
        Code::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "service unavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "server error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_status_mapping() {
        assert_eq!(http_status_for(Code::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(http_status_for(Code::InvalidArgument).0, StatusCode::BAD_REQUEST);
        assert_eq!(http_status_for(Code::Unauthenticated).0, StatusCode::UNAUTHORIZED);
        assert_eq!(http_status_for(Code::DeadlineExceeded).0, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(http_status_for(Code::DataLoss).0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
