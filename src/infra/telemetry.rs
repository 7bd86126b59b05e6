use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_CACHE_BACKEND_ERROR, METRIC_CACHE_DECODE_FAILURE, METRIC_CACHE_HIT,
    METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS, METRIC_CACHE_POPULATE,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

pub const METRIC_HTTP_ERROR_RESPONSES: &str = "scribe_http_error_responses_total";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of listing reads served from the page cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of listing reads that missed the page cache."
        );
        describe_counter!(
            METRIC_CACHE_POPULATE,
            Unit::Count,
            "Total number of listings loaded from the store after a miss."
        );
        describe_counter!(
            METRIC_CACHE_DECODE_FAILURE,
            Unit::Count,
            "Total number of cached payloads that failed to decode."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATE,
            Unit::Count,
            "Total number of whole-cache invalidations."
        );
        describe_counter!(
            METRIC_CACHE_BACKEND_ERROR,
            Unit::Count,
            "Total number of failed cache backend commands."
        );
        describe_counter!(
            METRIC_HTTP_ERROR_RESPONSES,
            Unit::Count,
            "Total number of 4xx and 5xx responses, labelled by status class."
        );
    });
}
