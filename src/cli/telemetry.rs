//! Logging and optional OTLP span export.
//!
//! The fmt layer is always installed. Spans are also exported over gRPC when
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set; `OTEL_EXPORTER_OTLP_HEADERS`
//! (`key=value,...`) becomes request metadata and `-bin` keys carry base64.

use anyhow::{Context, Result, anyhow};
use base64ct::{Base64, Encoding};
use once_cell::sync::OnceCell;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{env::var, time::Duration};
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Exporter settings read from the standard `OTEL_*` variables.
#[derive(Debug, PartialEq, Eq)]
struct OtlpSettings {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl OtlpSettings {
    /// `None` when no endpoint is configured.
    fn from_env() -> Option<Self> {
        let endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
        if let Ok(protocol) = var("OTEL_EXPORTER_OTLP_PROTOCOL")
            && protocol != "grpc"
        {
            debug!(protocol = %protocol, "only grpc OTLP export is supported, ignoring protocol");
        }
        Some(Self {
            endpoint: with_scheme(&endpoint),
            headers: var("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|raw| parse_header_pairs(&raw))
                .unwrap_or_default(),
            instance_id: var("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|_| Ulid::new().to_string()),
        })
    }

    /// Host to verify against when the endpoint is TLS.
    fn tls_domain(&self) -> Option<&str> {
        let rest = self.endpoint.strip_prefix("https://")?;
        let authority = rest.split('/').next()?;
        authority.split(':').next().filter(|host| !host.is_empty())
    }
}

/// gRPC endpoints without a scheme are TLS.
fn with_scheme(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

fn parse_header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}

fn metadata(headers: &[(String, String)]) -> Result<MetadataMap> {
    let mut map = MetadataMap::with_capacity(headers.len());
    for (key, value) in headers {
        if key.ends_with("-bin") {
            let bytes = Base64::decode_vec(value)
                .map_err(|e| anyhow!("failed to base64-decode value for key {key}: {e}"))?;
            let name = MetadataKey::<Binary>::from_bytes(key.as_bytes())
                .map_err(|e| anyhow!("invalid binary metadata key {key}: {e}"))?;
            map.insert_bin(name, MetadataValue::from_bytes(&bytes));
        } else {
            let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
                .map_err(|e| anyhow!("invalid metadata key {key}: {e}"))?;
            let value: MetadataValue<Ascii> = value
                .parse()
                .map_err(|e| anyhow!("invalid metadata value for key {key}: {e}"))?;
            map.insert(name, value);
        }
    }
    Ok(map)
}

fn init_tracer(settings: &OtlpSettings) -> Result<Tracer> {
    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(domain) = settings.tls_domain() {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.to_string())
                .with_native_roots(),
        );
    }
    if !settings.headers.is_empty() {
        builder = builder.with_metadata(metadata(&settings.headers)?);
    }

    let exporter = builder.build().context("failed to build OTLP span exporter")?;

    let resource = Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", settings.instance_id.clone()),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

fn env_filter(level: Level) -> Result<EnvFilter> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    for directive in ["hyper=error", "tokio=error", "sqlx=warn", "opentelemetry_sdk=warn"] {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or a subscriber is already set
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();
    let filter = env_filter(verbosity_level.unwrap_or(Level::ERROR))?;

    if let Some(settings) = OtlpSettings::from_env() {
        let tracer = init_tracer(&settings)?;
        let subscriber = Registry::default()
            .with(fmt_layer)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Flush pending spans; noop when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("shutting down tracer provider");
        let _ = provider.shutdown();
    }
}
