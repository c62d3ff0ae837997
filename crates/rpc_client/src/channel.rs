//! Long-lived client channel per backend service.

use crate::error::{Result, RpcError};
use crate::interceptor::{Interceptor, Next, RpcCall};
use crate::policy::RetryPolicy;
use crate::retry::RetryInterceptor;
use crate::trace::TracingInterceptor;
use crate::transport::{TonicTransport, Transport};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Endpoint;
use tonic::Status;
use tracing::info;

/// Default bound on establishing the transport at startup.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A shared, cheaply cloneable handle to one backend service.
///
/// The interceptor chain is fixed at construction; every call on the
/// channel runs through the same chain.
#[derive(Clone)]
pub struct RpcChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    service: String,
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl RpcChannel {
    /// Build a channel with the standard chain: tracing, then retry.
    pub fn new(service: impl Into<String>, transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        let service = service.into();
        let interceptors: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(TracingInterceptor::new(service.clone())),
            Arc::new(RetryInterceptor::new(policy)),
        ];
        Self::with_interceptors(service, transport, interceptors)
    }

    /// Build a channel with an explicit, ordered interceptor chain.
    pub fn with_interceptors(
        service: impl Into<String>,
        transport: Arc<dyn Transport>,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                service: service.into(),
                interceptors,
                transport,
            }),
        }
    }

    /// Name of the backend service this channel talks to.
    pub fn service(&self) -> &str {
        &self.inner.service
    }

    /// Run a unary call through the chain.
    pub async fn unary<Req, Resp>(&self, method: &'static str, request: &Req) -> std::result::Result<Resp, Status>
    where
        Req: prost::Message,
        Resp: prost::Message + Default,
    {
        let call = RpcCall::new(method, Bytes::from(request.encode_to_vec()));
        let body = self.call_raw(call).await?;
        Resp::decode(body).map_err(|e| Status::internal(format!("failed to decode {} response: {}", method, e)))
    }

    /// Run a pre-encoded call through the chain.
    pub async fn call_raw(&self, call: RpcCall) -> std::result::Result<Bytes, Status> {
        Next::new(&self.inner.interceptors, self.inner.transport.as_ref())
            .run(call)
            .await
    }
}

impl fmt::Debug for RpcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChannel")
            .field("service", &self.inner.service)
            .field("interceptors", &self.inner.interceptors.len())
            .finish()
    }
}

/// Dial `address` once and wrap it in an [`RpcChannel`] with tracing and retry.
///
/// Fails if the address is malformed or the transport cannot be established
/// within `connect_timeout`. Callers treat that as fatal at startup.
pub async fn make_client(
    service: &str,
    address: &str,
    policy: RetryPolicy,
    connect_timeout: Duration,
) -> Result<RpcChannel> {
    let endpoint = Endpoint::from_shared(address.to_string())
        .map_err(|source| RpcError::InvalidAddress {
            service: service.to_string(),
            address: address.to_string(),
            source,
        })?
        .connect_timeout(connect_timeout);

    let channel = match tokio::time::timeout(connect_timeout, endpoint.connect()).await {
        Ok(Ok(channel)) => channel,
        Ok(Err(source)) => {
            return Err(RpcError::Connect {
                service: service.to_string(),
                address: address.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(RpcError::ConnectTimeout {
                service: service.to_string(),
                address: address.to_string(),
            })
        }
    };

    info!(
        service,
        address,
        max_attempts = policy.max_attempts(),
        per_attempt_timeout = ?policy.per_attempt_timeout(),
        "connected to backend service"
    );

    Ok(RpcChannel::new(service, Arc::new(TonicTransport::new(channel)), policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tonic::Code;

    #[derive(Clone, PartialEq, prost::Message)]
    struct Ping {
        #[prost(string, tag = "1")]
        id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct Pong {
        #[prost(string, tag = "1")]
        id: String,
        #[prost(uint32, tag = "2")]
        seen: u32,
    }

    /// Fails with UNAVAILABLE until `fail_first` attempts have been made.
    struct Flaky {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl Transport for Flaky {
        async fn unary(&self, call: RpcCall) -> std::result::Result<Bytes, Status> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.fail_first {
                return Err(Status::unavailable("connection refused"));
            }
            let ping = <Ping as prost::Message>::decode(call.payload).unwrap();
            let pong = Pong { id: ping.id, seen: n };
            Ok(Bytes::from(prost::Message::encode_to_vec(&pong)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_unary_with_retry() {
        let transport = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let channel = RpcChannel::new("test.Echo", transport.clone(), RetryPolicy::default());

        let pong: Pong = channel
            .unary("/test.Echo/Ping", &Ping { id: "abc".to_string() })
            .await
            .unwrap();

        assert_eq!(pong.id, "abc");
        assert_eq!(pong.seen, 3);
        assert_eq!(channel.service(), "test.Echo");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_return_backend_status() {
        let transport = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
        });
        let channel = RpcChannel::new(
            "test.Echo",
            transport.clone(),
            RetryPolicy::new(4, Duration::from_secs(1)),
        );

        let err = channel
            .unary::<Ping, Pong>("/test.Echo/Ping", &Ping::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), Code::Unavailable);
        assert_eq!(err.message(), "connection refused");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_make_client_rejects_bad_address() {
        let err = make_client("sso.Auth", "not a uri", RetryPolicy::default(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::InvalidAddress { .. }));
    }
}
