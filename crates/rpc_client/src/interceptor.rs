//! Call-wrapping interceptor chain.

use crate::transport::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tonic::metadata::MetadataMap;
use tonic::Status;

/// A unary call as seen by interceptors: method path, metadata and the
/// already-encoded protobuf request.
#[derive(Debug, Clone)]
pub struct RpcCall {
    /// Full method path, e.g. `/sso.Auth/Login`.
    pub method: &'static str,
    /// Outgoing request metadata.
    pub metadata: MetadataMap,
    /// Encoded request message.
    pub payload: Bytes,
    /// Deadline propagated to the server as `grpc-timeout`.
    pub timeout: Option<Duration>,
}

impl RpcCall {
    pub fn new(method: &'static str, payload: Bytes) -> Self {
        Self {
            method,
            metadata: MetadataMap::new(),
            payload,
            timeout: None,
        }
    }
}

/// Wraps a unary call. Implementations call `next.run(call)` zero or more times.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, call: RpcCall, next: Next<'_>) -> Result<Bytes, Status>;
}

/// The remainder of the chain after the current interceptor.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Interceptor>], transport: &'a dyn Transport) -> Self {
        Self { chain, transport }
    }

    /// Invoke the next interceptor, or the transport once the chain is exhausted.
    pub fn run(self, call: RpcCall) -> BoxFuture<'a, Result<Bytes, Status>> {
        match self.chain.split_first() {
            Some((head, rest)) => head.intercept(call, Next::new(rest, self.transport)),
            None => self.transport.unary(call),
        }
    }
}
