//! Strategy validation and the submission payload built from it.

pub mod payload;
pub mod validator;

pub use payload::StrategyPayload;
pub use validator::{ConfigField, ConfigValidator, ValidatedStrategy, ValidationErrors};
