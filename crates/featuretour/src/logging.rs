#![forbid(unsafe_code)]

//! Structured logging setup.
//!
//! The library itself only emits `tracing` events. Hosts that have no
//! subscriber of their own can enable the `tracing-json` feature and call
//! [`init_json_subscriber`] once at startup. The filter comes from the
//! [`ENV_LOG`] variable (for example `FEATURETOUR_LOG=featuretour=debug`)
//! and defaults to [`DEFAULT_FILTER`].

/// Environment variable holding the log filter directive.
pub const ENV_LOG: &str = "FEATURETOUR_LOG";

/// Filter used when [`ENV_LOG`] is unset or empty.
pub const DEFAULT_FILTER: &str = "warn";

/// Filter directive taken from `lookup(ENV_LOG)`, falling back to
/// [`DEFAULT_FILTER`].
pub fn filter_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    match lookup(ENV_LOG) {
        Some(val) if !val.trim().is_empty() => val,
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Install a global JSON subscriber.
///
/// Fails if a global subscriber is already set.
#[cfg(feature = "tracing-json")]
pub fn init_json_subscriber() -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let directive = filter_directive(|key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true),
        )
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_uses_default() {
        assert_eq!(filter_directive(|_| None), "warn");
    }

    #[test]
    fn blank_variable_uses_default() {
        assert_eq!(filter_directive(|_| Some("  ".into())), "warn");
    }

    #[test]
    fn variable_overrides_default() {
        let directive = filter_directive(|key| {
            assert_eq!(key, ENV_LOG);
            Some("featuretour=debug".into())
        });
        assert_eq!(directive, "featuretour=debug");
    }
}
