use crate::models::indicators::{Comparator, IndicatorKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("unknown indicator '{0}'")]
    UnknownIndicator(String),

    #[error("{kind} has no parameter '{param}'")]
    UnknownParameter { kind: IndicatorKind, param: String },

    #[error("{kind} requires parameter '{param}'")]
    MissingParameter { kind: IndicatorKind, param: String },

    #[error("parameter '{param}' expects {expected}, got {found}")]
    InvalidType {
        param: String,
        expected: &'static str,
        found: String,
    },

    #[error("parameter '{param}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        param: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("parameter '{param}' does not accept '{value}'")]
    UnsupportedChoice { param: String, value: String },

    #[error("{kind} does not support comparator '{comparator}'")]
    UnsupportedComparator {
        kind: IndicatorKind,
        comparator: Comparator,
    },

    #[error("{kind}: {reason}")]
    Inconsistent {
        kind: IndicatorKind,
        reason: String,
    },
}
