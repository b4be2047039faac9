//! Global subscriber for the `parley` binary.
//!
//! Events go to stderr so that `--json` command output on stdout stays
//! machine-readable. The event format is human-oriented text or one JSON
//! object per line for log shippers. Spans can additionally be exported
//! through OpenTelemetry.
//!
//! ```no_run
//! use parley_observe::tracing_setup::{LogFormat, LogSettings, init_tracing};
//!
//! init_tracing(&LogSettings {
//!     default_filter: "info",
//!     format: LogFormat::Json,
//!     export_spans: false,
//! })
//! .unwrap();
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Held so `shutdown_tracing` can flush exported spans.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// How log events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line text with level, target, and fields.
    #[default]
    Pretty,
    /// Newline-delimited JSON, one object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?} (expected pretty or json)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogSettings<'a> {
    /// Directive used when `RUST_LOG` is unset or invalid.
    pub default_filter: &'a str,
    pub format: LogFormat,
    /// Bridge spans to an OpenTelemetry stdout exporter.
    pub export_spans: bool,
}

/// Default directive for the CLI verbosity flags.
///
/// The daemon logs lifecycle events at info; one-shot commands stay at warn
/// unless asked.
pub fn verbosity_filter(verbose: u8, quiet: bool, daemon: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 if daemon => "info",
        0 => "warn",
        1 => "info,parley=debug",
        _ => "trace",
    }
}

/// `RUST_LOG` when set and valid, otherwise `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(settings: &LogSettings<'_>) -> Result<(), TryInitError> {
    let (text_layer, json_layer) = match settings.format {
        LogFormat::Pretty => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    let otel_layer = settings.export_spans.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("parley");
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter(settings.default_filter))
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()
}

/// Flush and stop span export. No-op unless spans were exported.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("warning: span exporter shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        let err = "yaml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("yaml"));
    }

    #[test]
    fn log_format_display_parses_back() {
        for format in [LogFormat::Pretty, LogFormat::Json] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn verbosity_overrides_quiet_and_daemon() {
        assert_eq!(verbosity_filter(0, false, false), "warn");
        assert_eq!(verbosity_filter(0, false, true), "info");
        assert_eq!(verbosity_filter(0, true, true), "error");
        assert_eq!(verbosity_filter(1, true, false), "info,parley=debug");
        assert_eq!(verbosity_filter(3, false, false), "trace");
    }

    #[test]
    fn env_filter_falls_back_to_default() {
        if std::env::var_os("RUST_LOG").is_none() {
            let filter = env_filter("warn,parley=debug");
            assert!(filter.to_string().contains("parley=debug"));
        }
    }

    #[test]
    fn shutdown_without_export_is_noop() {
        shutdown_tracing();
    }
}
