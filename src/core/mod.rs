//! Core application primitives (poll loop, cadence)

pub mod runtime;
pub mod scheduler;

pub use runtime::*;
pub use scheduler::*;
