use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::plain_text::{
    METRIC_MARK_TOTAL, METRIC_REGENERATE_MS, METRIC_REGENERATE_TOTAL,
};
use crate::cache::{METRIC_MEMO_HIT, METRIC_MEMO_MISS};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Fails when a global subscriber is already installed.
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

/// Register descriptions for every metric the crate emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_MEMO_HIT,
            Unit::Count,
            "Derived text reads answered from the session memo."
        );
        describe_counter!(
            METRIC_MEMO_MISS,
            Unit::Count,
            "Derived text reads that missed the session memo."
        );
        describe_counter!(
            METRIC_MARK_TOTAL,
            Unit::Count,
            "Nodes flagged as having stale derived text."
        );
        describe_counter!(
            METRIC_REGENERATE_TOTAL,
            Unit::Count,
            "Nodes whose derived text was regenerated."
        );
        describe_histogram!(
            METRIC_REGENERATE_MS,
            Unit::Milliseconds,
            "Time spent regenerating one node's derived text, in milliseconds."
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn second_install_is_rejected() {
        let logging = LoggingSettings {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        };
        assert!(init(&logging).is_ok());
        let err = init(&logging).expect_err("subscriber already installed");
        assert!(matches!(err, InfraError::Telemetry(_)));
    }
}
