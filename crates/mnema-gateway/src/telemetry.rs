//! `tracing` subscriber setup for the gateway process.
//!
//! Log rendering and filtering come from the gateway configuration
//! ([`GatewayConfig::log_format`] / [`GatewayConfig::log_filter`], both
//! overridable through `MNEMA_*` env vars); span export follows the OTel
//! convention and turns on when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! `RUST_LOG`, when present, wins over the configured filter.
//!
//! Call [`init_tracing`] once, before the Tokio runtime exists, and hold
//! the returned guard until the process exits.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::GatewayConfig;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human-readable output.
    Compact,
    /// Newline-delimited JSON, one event per line.
    Json,
}

impl LogFormat {
    /// Parse a config label; anything other than `"json"` renders compact.
    pub fn parse(label: &str) -> Self {
        if label.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Compact
        }
    }
}

/// Resolved telemetry parameters for one process.
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// Service name attached to exported spans.
    pub service: String,
    /// Log rendering.
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is absent.
    pub filter: String,
    /// OTLP collector base URL; `None` disables span export.
    pub otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    /// Resolve the settings from the gateway config and the OTel env
    /// contract.
    pub fn resolve(service: &str, cfg: &GatewayConfig) -> Self {
        Self {
            service: service.to_string(),
            format: LogFormat::parse(&cfg.log_format),
            filter: cfg.log_filter.clone(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
        }
    }
}

/// Install the global subscriber: filter, optional OTLP span layer, and
/// the configured log formatter.
///
/// The returned [`TracerProviderGuard`] must live for the whole process;
/// dropping it flushes pending span batches.
pub fn init_tracing(settings: &TelemetrySettings) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.filter.clone()));

    let provider = settings
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_provider(&settings.service, endpoint));
    let span_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("mnema-gateway")));

    let fmt_layer = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(span_layer)
        .with(fmt_layer)
        .init();

    TracerProviderGuard(provider)
}

/// Flushes and shuts down the span exporter on drop. Holds nothing when
/// export is disabled.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[mnema] span exporter shutdown error: {e}");
            }
        }
    }
}

fn build_provider(service: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[mnema] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // Simple (synchronous) export: init_tracing runs before the
            // Tokio runtime exists, so a batch exporter cannot spawn its
            // worker here.
            .with_simple_exporter(exporter)
            .build(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_labels_parse_case_insensitively() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse(""), LogFormat::Compact);
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Compact);
    }

    #[test]
    fn settings_resolve_from_config() {
        // SAFETY: single-threaded test; no other thread reads this env-var.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        let cfg = GatewayConfig {
            log_format: "json".to_string(),
            log_filter: "mnema_store=debug".to_string(),
            ..GatewayConfig::default()
        };

        let settings = TelemetrySettings::resolve("mnema-test", &cfg);
        assert_eq!(settings.service, "mnema-test");
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.filter, "mnema_store=debug");
        assert!(settings.otlp_endpoint.is_none());
    }

    #[test]
    fn guard_without_provider_drops_cleanly() {
        drop(TracerProviderGuard(None));
    }
}
