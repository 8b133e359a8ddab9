use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use rocket::{
    Data, Request, Response,
    fairing::{Fairing, Info, Kind},
};
use std::time::Instant;
use tonic::metadata::MetadataMap;
use tracing::{Span, field::Empty, info_span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub struct TelemetryFairing;

#[rocket::async_trait]
impl Fairing for TelemetryFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request tracing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let method = request.method().to_string();
        let uri = request.uri().path().to_string();

        let span = info_span!(
            "http_request",
            otel.name = format!("{} {}", method, uri),
            http.method = %method,
            http.uri = %uri,
            http.status_code = Empty,
            http.duration_ms = Empty,
        );

        request.local_cache(|| (span, Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let (span, start_time): &(Span, Instant) =
            request.local_cache(|| (info_span!("http_request"), Instant::now()));

        let duration = start_time.elapsed();
        let status = response.status().code;

        span.record("http.status_code", status);
        span.record("http.duration_ms", duration.as_millis() as i64);

        span.in_scope(|| {
            tracing::info!(
                "Completed request in {}ms with status {}",
                duration.as_millis(),
                status
            );
        });
    }
}

fn resource() -> Resource {
    let environment = dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, environment),
            ],
            SCHEMA_URL,
        )
        .build()
}

fn init_tracer_provider(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let mut metadata = MetadataMap::new();
    if let Ok(api_key) = dotenvy::var("HONEYCOMB_API_KEY") {
        metadata.insert("x-honeycomb-team", api_key.parse()?);
    }

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_protocol(Protocol::Grpc)
        .with_metadata(metadata);

    if endpoint.starts_with("https") {
        builder =
            builder.with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots());
    }

    let exporter = builder.build()?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build())
}

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

/// Installs the global subscriber. Spans are exported over OTLP only when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set; keep the returned guard alive for
/// the life of the process so pending spans are flushed on exit.
pub fn init_tracing() -> Option<OtelGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let tracer_provider = match dotenvy::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => match init_tracer_provider(&endpoint) {
            Ok(provider) => Some(provider),
            Err(err) => {
                eprintln!("Failed to initialise OTLP exporter, continuing without it: {err}");
                None
            }
        },
        Err(_) => None,
    };

    let otel_layer = tracer_provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer("tcg-hub")));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer);

    if let Err(err) = registry.try_init() {
        eprintln!("Tracing subscriber already installed: {err}");
    }

    tracer_provider.map(|tracer_provider| OtelGuard { tracer_provider })
}
