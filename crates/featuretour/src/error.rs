#![forbid(unsafe_code)]

//! Errors raised while loading or validating a tour.
//!
//! Navigation never fails with an error: a missing anchor is reported as a
//! `false` result plus a warning. Only configuration problems surface here,
//! and they surface before any popup or window state is touched.

use thiserror::Error;

/// Tour configuration errors.
#[derive(Debug, Error)]
pub enum TourError {
    /// The tour has no steps. A JSON definition with `"steps": null` lands here.
    #[error("unable to start a tour without steps")]
    EmptySteps,
    /// A step has a missing or empty anchor key.
    #[error("step {index} has no element id")]
    BlankElementId {
        /// Zero-based position of the offending step.
        index: usize,
    },
    /// A tour definition could not be parsed.
    #[error("failed to parse tour definition: {0}")]
    Parse(#[from] serde_json::Error),
}

impl TourError {
    /// Short label used as the `error_type` field in log events.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::EmptySteps => "empty_steps",
            Self::BlankElementId { .. } => "blank_element_id",
            Self::Parse(_) => "parse",
        }
    }
}

/// Result alias for tour configuration.
pub type Result<T> = std::result::Result<T, TourError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        assert_eq!(
            TourError::EmptySteps.to_string(),
            "unable to start a tour without steps"
        );
        assert_eq!(
            TourError::BlankElementId { index: 2 }.to_string(),
            "step 2 has no element id"
        );
    }

    #[test]
    fn error_type_labels() {
        assert_eq!(TourError::EmptySteps.error_type(), "empty_steps");
        assert_eq!(
            TourError::BlankElementId { index: 0 }.error_type(),
            "blank_element_id"
        );
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(TourError::from(parse).error_type(), "parse");
    }
}
