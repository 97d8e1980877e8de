//! Tracing and log output setup.
//!
//! Logs go to stderr so that stdout carries only command output.

use std::io::IsTerminal;

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Service name reported when `OTEL_SERVICE_NAME` is not set.
const SERVICE_NAME: &str = "rancherctl";

/// Environment variable for service name (not exported by opentelemetry_sdk).
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

/// Flushes exported spans when dropped; keep it alive for the whole run.
pub struct TelemetryGuard {
	tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
	fn drop(&mut self) {
		if let Some(provider) = self.tracer_provider.take() {
			if let Err(e) = provider.shutdown() {
				eprintln!("Failed to shutdown tracer provider: {e}");
			}
		}
	}
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
	Pretty,
	Json,
}

impl LogFormat {
	/// Pretty for an interactive terminal, JSON for pipes and log collectors.
	pub fn detect() -> Self {
		if std::io::stderr().is_terminal() {
			Self::Pretty
		} else {
			Self::Json
		}
	}
}

/// `--log-level` wins over `RUST_LOG`, which wins over `info`.
pub fn env_filter(log_level: Option<Level>) -> EnvFilter {
	match log_level {
		Some(level) => EnvFilter::new(level.as_str()),
		None => EnvFilter::builder()
			.with_default_directive(Level::INFO.into())
			.from_env_lossy(),
	}
}

fn otel_export_enabled() -> bool {
	std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_ENDPOINT).is_ok()
		|| std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_TRACES_ENDPOINT).is_ok()
}

/// Install the global subscriber.
///
/// OpenTelemetry export is added when `OTEL_EXPORTER_OTLP_ENDPOINT` or
/// `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT` is set, and is otherwise configured
/// through the standard `OTEL_*` variables.
pub fn init(log_level: Option<Level>) -> Result<TelemetryGuard> {
	let fmt_layer = match LogFormat::detect() {
		LogFormat::Pretty => tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.pretty()
			.boxed(),
		LogFormat::Json => tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.json()
			.boxed(),
	};

	let registry = tracing_subscriber::registry()
		.with(env_filter(log_level))
		.with(fmt_layer);

	if !otel_export_enabled() {
		registry.init();
		return Ok(TelemetryGuard {
			tracer_provider: None,
		});
	}

	let tracer_provider = otel_tracer_provider()?;
	let otel_layer = tracing_opentelemetry::layer()
		.with_error_records_to_exceptions(true)
		.with_tracer(tracer_provider.tracer(SERVICE_NAME));
	registry.with(otel_layer).init();
	opentelemetry::global::set_tracer_provider(tracer_provider.clone());

	Ok(TelemetryGuard {
		tracer_provider: Some(tracer_provider),
	})
}

fn otel_tracer_provider() -> Result<SdkTracerProvider> {
	use opentelemetry_sdk::Resource;

	// Resource::builder() reads `OTEL_SERVICE_NAME` and `OTEL_RESOURCE_ATTRIBUTES` itself
	let mut resource = Resource::builder();
	if std::env::var(OTEL_SERVICE_NAME).is_err() {
		resource = resource.with_service_name(SERVICE_NAME);
	}

	let exporter = match std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL)
		.as_deref()
		.unwrap_or(opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL_DEFAULT)
	{
		"grpc" => opentelemetry_otlp::SpanExporter::builder()
			.with_tonic()
			.build()?,
		_ => opentelemetry_otlp::SpanExporter::builder()
			.with_http()
			.build()?,
	};

	Ok(SdkTracerProvider::builder()
		.with_resource(resource.build())
		.with_batch_exporter(exporter)
		.build())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_explicit_level_overrides_env() {
		let filter = env_filter(Some(Level::DEBUG));
		assert_eq!(filter.to_string(), "debug");
	}
}
