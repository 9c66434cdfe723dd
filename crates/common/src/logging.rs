//! Sets up `tracing` output for the staking tools, with optional OpenTelemetry export.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the OTLP collector endpoint. Export is disabled when unset.
pub const OTLP_URL_ENVVAR: &str = "STAKING_OTLP_URL";

/// Environment variable holding an instance label that is appended to the service name.
pub const SVC_LABEL_ENVVAR: &str = "STAKING_SVC_LABEL";

/// Setting this to `1` includes the source file in every log line.
const LOG_FILE_ENVVAR: &str = "LOG_FILE";

/// Setting this to `1` includes the source line number in every log line.
const LOG_LINE_NUM_ENVVAR: &str = "LOG_LINE_NUM";

/// Errors raised while bringing up the logging stack.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The OTLP exporter could not be built.
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),

    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Name under which this process reports itself.
    service_name: String,

    /// Collector endpoint for span export.
    otlp_url: Option<String>,
}

impl LoggerConfig {
    /// Creates a config with the given service name and no span export.
    pub const fn new(service_name: String) -> Self {
        Self {
            service_name,
            otlp_url: None,
        }
    }

    /// Creates a config for `base`, suffixed with the service label from the environment and with
    /// the OTLP endpoint from the environment if one is set.
    pub fn from_env(base: &str) -> Self {
        Self {
            service_name: service_name(base),
            otlp_url: env::var(OTLP_URL_ENVVAR).ok(),
        }
    }

    /// Sets the OTLP endpoint spans are exported to.
    pub fn with_otlp_url(mut self, url: impl Into<String>) -> Self {
        self.otlp_url = Some(url.into());
        self
    }

    /// Returns the service name logs are reported under.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::from_env("staking")
    }
}

/// Installs the global tracing subscriber.
///
/// Stdout output is filtered through `RUST_LOG`. When an OTLP endpoint is configured, spans are
/// additionally batched to it.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    let flag = |var: &str| env::var(var).is_ok_and(|v| v == "1");

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_file(flag(LOG_FILE_ENVVAR))
                .with_line_number(flag(LOG_LINE_NUM_ENVVAR)),
        )
        .with_filter(EnvFilter::from_default_env());

    match &config.otlp_url {
        Some(url) => {
            let resource = Resource::builder()
                .with_attribute(KeyValue::new("service.name", config.service_name.clone()))
                .build();

            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(url)
                .build()
                .map_err(|e| LoggingError::Exporter(e.to_string()))?;

            let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_resource(resource)
                .with_batch_exporter(exporter)
                .build();

            let otel_layer =
                tracing_opentelemetry::layer().with_tracer(provider.tracer("staking"));

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(otel_layer)
                .try_init()?;
        }
        None => tracing_subscriber::registry().with(stdout_layer).try_init()?,
    }

    info!(service = %config.service_name, "logging started");
    Ok(())
}

/// Builds the service name for `base`, appending `%<label>` when a service label is set.
pub fn service_name(base: &str) -> String {
    match env::var(SVC_LABEL_ENVVAR) {
        Ok(label) if !label.is_empty() => format!("{base}%{label}"),
        _ => base.to_owned(),
    }
}
