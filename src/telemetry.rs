//! Telemetry logic.
//! Console logging with the request correlation ID on every line.

use axum::http::Request;
use tower_http::request_id::RequestId;
use tower_http::trace::MakeSpan;
use tracing::Span;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::Settings;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Logger sharing the root logger level.
pub const GENERAL_TARGET: &str = "general";
const MISSING_CID: &str = "none";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid logging directive: {0}")]
    Directive(#[from] ParseError),
    #[error(transparent)]
    Init(#[from] TryInitError),
}

/// Build the filter: `INFO` everywhere (or `RUST_LOG`), `log_level` for
/// the root logger and `general`.
pub fn filter(settings: &Settings) -> Result<EnvFilter, TelemetryError> {
    let level = settings.log_level;

    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive(
            format!("{}={level}", settings.logger_root_name).parse()?,
        )
        .add_directive(format!("{GENERAL_TARGET}={level}").parse()?))
}

/// Install the global subscriber.
pub fn setup_logging(settings: &Settings) -> Result<(), TelemetryError> {
    let format = tracing_subscriber::fmt::layer()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_owned()))
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter(settings)?)
        .with(format)
        .try_init()?;

    Ok(())
}

/// Open one `request` span per HTTP request, tagged with its correlation ID.
///
/// Must run after the request ID has been assigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationSpan;

impl<B> MakeSpan<B> for CorrelationSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            cid = %correlation_id(request).unwrap_or(MISSING_CID),
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Correlation ID assigned to a request, if any.
pub fn correlation_id<B>(request: &Request<B>) -> Option<&str> {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
}
