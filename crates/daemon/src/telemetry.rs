//! Optional OTLP span export for the display daemon
//!
//! Export is opt-in: it only turns on when `OTEL_EXPORTER_OTLP_ENDPOINT`
//! is set and the binary was built with the `telemetry` feature. The
//! returned layer is composed into the daemon's single subscriber, so
//! nothing here installs a global subscriber of its own.

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

pub const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const SERVICE_NAME_VAR: &str = "OTEL_SERVICE_NAME";
pub const DEFAULT_SERVICE_NAME: &str = "waitline-display";

/// Layer that ships spans to the collector
pub type ExportLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where and as whom spans are exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub endpoint: String,
    pub service_name: String,
}

impl ExportTarget {
    /// Resolve the export target from raw environment values.
    /// An unset or blank endpoint means export is off.
    pub fn resolve(endpoint: Option<String>, service_name: Option<String>) -> Option<Self> {
        let endpoint = endpoint?.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }
        let service_name = service_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        Some(Self {
            endpoint,
            service_name,
        })
    }

    pub fn from_env() -> Option<Self> {
        Self::resolve(
            std::env::var(ENDPOINT_VAR).ok(),
            std::env::var(SERVICE_NAME_VAR).ok(),
        )
    }
}

/// Build the export layer, if export is configured.
///
/// Runs before the subscriber exists, so it reports through its return
/// value rather than through `tracing`.
///
/// ```text
/// OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
/// OTEL_SERVICE_NAME=waitline-lobby \
///     ./waitline-display
/// ```
pub fn export_layer() -> Result<Option<(ExportLayer, ExportTarget)>> {
    match ExportTarget::from_env() {
        Some(target) => Ok(Some((build_layer(&target)?, target))),
        None => Ok(None),
    }
}

#[cfg(feature = "telemetry")]
fn build_layer(target: &ExportTarget) -> Result<ExportLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::{SpanExporter, WithExportConfig};
    use opentelemetry_sdk::trace::TracerProvider;
    use opentelemetry_sdk::{runtime, Resource};

    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(target.endpoint.as_str())
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            target.service_name.clone(),
        )]))
        .build();

    let tracer = provider.tracer(target.service_name.clone());
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}

#[cfg(not(feature = "telemetry"))]
fn build_layer(_target: &ExportTarget) -> Result<ExportLayer> {
    anyhow::bail!(
        "{} is set but this build lacks the 'telemetry' feature \
         (rebuild with: cargo build -p waitline-daemon --features telemetry)",
        ENDPOINT_VAR
    )
}

/// Flush buffered spans on the way out
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_requires_endpoint() {
        assert_eq!(ExportTarget::resolve(None, Some("lobby".into())), None);
        assert_eq!(ExportTarget::resolve(Some("  ".into()), None), None);
    }

    #[test]
    fn test_resolve_defaults_service_name() {
        let target = ExportTarget::resolve(Some("http://collector:4317".into()), Some("".into()))
            .unwrap();
        assert_eq!(target.endpoint, "http://collector:4317");
        assert_eq!(target.service_name, DEFAULT_SERVICE_NAME);

        let named = ExportTarget::resolve(
            Some(" http://collector:4317 ".into()),
            Some("waitline-lobby".into()),
        )
        .unwrap();
        assert_eq!(named.endpoint, "http://collector:4317");
        assert_eq!(named.service_name, "waitline-lobby");
    }

    #[cfg(not(feature = "telemetry"))]
    #[test]
    fn test_endpoint_without_feature_is_reported() {
        let target = ExportTarget::resolve(Some("http://collector:4317".into()), None).unwrap();
        let err = build_layer(&target).err().unwrap();
        assert!(err.to_string().contains("telemetry"));
    }

    #[cfg(feature = "telemetry")]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_layer_composes_into_subscriber() {
        use tracing_subscriber::layer::SubscriberExt;

        let target = ExportTarget::resolve(Some("http://127.0.0.1:4317".into()), None).unwrap();
        let layer = build_layer(&target).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(Some(layer))
            .with(tracing_subscriber::EnvFilter::new("info"));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!("surface").in_scope(|| tracing::info!("exported"));
        });
        shutdown();
    }
}
