pub mod error;
pub mod parser;
pub mod registry;
pub mod validation;

pub use error::IndicatorError;
pub use registry::{ParamDef, ParamDefault, ParamType};
pub use validation::validate_comparator;
