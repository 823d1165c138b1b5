//! Shared `OpenTelemetry` metrics initialisation.
//!
//! This module is only compiled when the `metrics` Cargo feature is enabled.
//! It sets up the OTLP exporter for traces and metrics and exposes the
//! service counters the server records presence and chat activity on.

use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Errors that can occur during metrics / tracing pipeline initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to build an OTLP exporter.
    #[error("failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Failed during `OTel` SDK shutdown or flush.
    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// Opaque handle that keeps the `OpenTelemetry` providers alive.
///
/// Call [`MetricsGuard::shutdown`] for a graceful flush before exiting.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Gracefully shut down both providers, flushing any buffered telemetry.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        self.tracer_provider.shutdown()?;
        self.meter_provider.shutdown()?;
        Ok(())
    }
}

/// Initialise the `OpenTelemetry` OTLP pipeline for traces **and** metrics.
///
/// * `endpoint` -- OTLP receiver URL, e.g. `"http://localhost:4317"` (gRPC).
pub fn init_metrics(endpoint: &str) -> Result<MetricsGuard, MetricsError> {
    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .build();

    global::set_tracer_provider(tracer_provider.clone());

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();

    global::set_meter_provider(meter_provider.clone());

    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}

/// Counters recorded by the server.
#[derive(Clone)]
pub struct ServiceMeters {
    pub viewer_joins: Counter<u64>,
    pub viewer_leaves: Counter<u64>,
    pub chat_messages: Counter<u64>,
    pub presence_expired: Counter<u64>,
    pub watchers_reconciled: Counter<u64>,
}

impl ServiceMeters {
    /// Build the counters from the global meter provider.
    pub fn new() -> Self {
        let meter = global::meter("toto");
        Self {
            viewer_joins: meter.u64_counter("toto.viewer.joins").build(),
            viewer_leaves: meter.u64_counter("toto.viewer.leaves").build(),
            chat_messages: meter.u64_counter("toto.chat.messages").build(),
            presence_expired: meter.u64_counter("toto.presence.expired").build(),
            watchers_reconciled: meter.u64_counter("toto.watchers.reconciled").build(),
        }
    }
}

impl Default for ServiceMeters {
    fn default() -> Self {
        Self::new()
    }
}
