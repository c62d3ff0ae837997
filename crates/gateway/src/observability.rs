//! Logging, distributed tracing and metrics setup.
//!
//! Installs the W3C trace-context propagator (so outbound RPCs carry
//! `traceparent`), a `tracing` subscriber filtered by `RUST_LOG`, and an
//! optional OTLP span exporter. Export is best-effort: if the exporter
//! cannot be built the gateway logs locally only.

use crate::config::Mode;
use crate::error::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Keeps the tracer provider alive; flush it with [`Telemetry::shutdown`].
#[must_use = "dropping Telemetry without shutdown loses buffered spans"]
pub struct Telemetry {
    provider: Option<TracerProvider>,
}

impl Telemetry {
    /// Whether spans are exported over OTLP.
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }

    /// Flush and stop the span exporter.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                warn!("Failed to flush tracer provider: {}", e);
            }
        }
    }
}

/// Install the global propagator and subscriber.
///
/// Must be called once, from inside the tokio runtime.
pub fn init_observability(service_name: &str, mode: Mode, otlp_endpoint: Option<&str>) -> Telemetry {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let provider = otlp_endpoint.map(|endpoint| (endpoint, build_tracer_provider(service_name, endpoint)));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = match mode {
        Mode::Prod => fmt::layer().json().with_current_span(true).boxed(),
        Mode::Dev => fmt::layer().boxed(),
    };

    let tracer = match &provider {
        Some((_, Ok(provider))) => Some(provider.tracer(service_name.to_string())),
        _ => None,
    };
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    let provider = match provider {
        Some((endpoint, Ok(provider))) => {
            global::set_tracer_provider(provider.clone());
            info!("Exporting traces to {}", endpoint);
            Some(provider)
        }
        Some((endpoint, Err(e))) => {
            warn!("OTLP exporter for {} unavailable, logging locally only: {}", endpoint, e);
            None
        }
        None => None,
    };

    Telemetry { provider }
}

fn build_tracer_provider(
    service_name: &str,
    endpoint: &str,
) -> std::result::Result<TracerProvider, opentelemetry::trace::TraceError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(resource_attributes(service_name)))
        .build())
}

fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ];
    if let Ok(host) = std::env::var("HOSTNAME") {
        attrs.push(KeyValue::new("service.instance.id", host));
    }
    attrs
}

/// Start the Prometheus exporter on `0.0.0.0:port`.
pub fn install_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;
    info!("Prometheus metrics server started on port {}", port);
    Ok(())
}
