//! Shared data models spanning the schema, strategy and queue layers.

pub mod condition;
pub mod indicators;
pub mod job;
pub mod strategy;

pub use condition::Condition;
pub use indicators::{
    Choice, Comparator, IndicatorKind, IndicatorParams, MaType, MacdTrigger, SignalRating,
    Timeframe,
};
pub use job::{CompletedResult, Job, JobId, JobStatus};
pub use strategy::{
    ConditionMode, ConditionSet, ConditionSlot, ConfigError, DataSource, DateRange,
    StrategyConfig,
};
