//! Tracing interceptor: one client span per call, trace context propagated
//! to the backend in request metadata.

use crate::interceptor::{Interceptor, Next, RpcCall};
use async_trait::async_trait;
use bytes::Bytes;
use opentelemetry::propagation::Injector;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tonic::{Code, Status};
use tracing::field::Empty;
use tracing::{info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Debug, Clone)]
pub struct TracingInterceptor {
    service: String,
}

impl TracingInterceptor {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl Interceptor for TracingInterceptor {
    async fn intercept(&self, mut call: RpcCall, next: Next<'_>) -> Result<Bytes, Status> {
        let span = info_span!(
            "grpc.client",
            otel.kind = "client",
            rpc.system = "grpc",
            rpc.service = %self.service,
            rpc.method = call.method,
            rpc.grpc.status_code = Empty,
            otel.status_code = Empty,
        );

        let cx = span.context();
        opentelemetry::global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&cx, &mut MetadataInjector(&mut call.metadata));
        });

        let result = next.run(call).instrument(span.clone()).await;

        let code = match &result {
            Ok(_) => Code::Ok,
            Err(status) => status.code(),
        };
        span.record("rpc.grpc.status_code", code as i32);
        span.record("otel.status_code", if code == Code::Ok { "OK" } else { "ERROR" });

        result
    }
}

/// Writes propagation fields into gRPC metadata.
struct MetadataInjector<'a>(&'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let Ok(key) = MetadataKey::from_bytes(key.as_bytes()) else {
            return;
        };
        let Ok(value) = MetadataValue::try_from(value.as_str()) else {
            return;
        };
        self.0.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    struct Capture {
        metadata: Mutex<Option<MetadataMap>>,
        reply: Result<(), Code>,
    }

    #[async_trait]
    impl Transport for Capture {
        async fn unary(&self, call: RpcCall) -> Result<Bytes, Status> {
            *self.metadata.lock().unwrap() = Some(call.metadata);
            match self.reply {
                Ok(()) => Ok(Bytes::new()),
                Err(code) => Err(Status::new(code, "backend said no")),
            }
        }
    }

    #[tokio::test]
    async fn test_injects_traceparent() {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        let provider = opentelemetry_sdk::trace::TracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")));
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Capture {
            metadata: Mutex::new(None),
            reply: Ok(()),
        };
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(TracingInterceptor::new("sso.Auth"))];

        Next::new(&chain, &transport)
            .run(RpcCall::new("/sso.Auth/Login", Bytes::new()))
            .await
            .unwrap();

        let metadata = transport.metadata.lock().unwrap().take().unwrap();
        let traceparent = metadata.get("traceparent").expect("traceparent injected");
        assert!(traceparent.to_str().unwrap().starts_with("00-"));
    }

    #[tokio::test]
    async fn test_error_passes_through_unchanged() {
        let transport = Capture {
            metadata: Mutex::new(None),
            reply: Err(Code::NotFound),
        };
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(TracingInterceptor::new("sso.Auth"))];

        let err = Next::new(&chain, &transport)
            .run(RpcCall::new("/sso.Auth/GetUserByID", Bytes::new()))
            .await
            .unwrap_err();

        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(err.message(), "backend said no");
    }
}
