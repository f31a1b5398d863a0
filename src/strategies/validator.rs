//! Field-level validation of a strategy configuration before submission.
//!
//! Validation never mutates the configuration and never short-circuits: every
//! rule runs and every failure is reported, keyed by the field it belongs to.

use crate::models::strategy::{ConditionSlot, StrategyConfig, MIN_INITIAL_CAPITAL};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const MAX_FEE_RATE: f64 = 10.0;

/// Validated fields, declared in the order the first invalid field is focused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigField {
    Name,
    MaxConcurrentPositions,
    InitialCapital,
    StartDate,
    EndDate,
    Assets,
    EntryConditions,
    Conditions,
    FeeRate,
    TakeProfit,
    StopLoss,
    SafetyOrders,
}

impl ConfigField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigField::Name => "name",
            ConfigField::MaxConcurrentPositions => "maxConcurrentPositions",
            ConfigField::InitialCapital => "initialCapital",
            ConfigField::StartDate => "startDate",
            ConfigField::EndDate => "endDate",
            ConfigField::Assets => "assets",
            ConfigField::EntryConditions => "entryConditions",
            ConfigField::Conditions => "conditions",
            ConfigField::FeeRate => "feeRate",
            ConfigField::TakeProfit => "takeProfit",
            ConfigField::StopLoss => "stopLoss",
            ConfigField::SafetyOrders => "safetyOrders",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field → message map; at most one message per field, the first one recorded wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<ConfigField, String>,
}

impl ValidationErrors {
    fn add(&mut self, field: ConfigField, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: ConfigField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: ConfigField) -> bool {
        self.errors.contains_key(&field)
    }

    /// The field a form should move focus to
    pub fn first_invalid(&self) -> Option<ConfigField> {
        self.errors.keys().next().copied()
    }

    pub fn fields(&self) -> Vec<ConfigField> {
        self.errors.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConfigField, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// Wire-style map keyed by camelCase field names
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|(f, m)| (f.as_str().to_string(), m.clone()))
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "invalid strategy configuration ({})", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Run every rule against `config`; `today` bounds the end date
    pub fn validate(config: &StrategyConfig, today: NaiveDate) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        if config.name.trim().is_empty() {
            errors.add(ConfigField::Name, "Strategy name is required");
        }

        if config.max_concurrent_positions < 1 {
            errors.add(
                ConfigField::MaxConcurrentPositions,
                "At least one concurrent position is required",
            );
        }

        if !config.initial_capital.is_finite() || config.initial_capital < MIN_INITIAL_CAPITAL {
            errors.add(
                ConfigField::InitialCapital,
                format!("Initial capital must be at least {}", MIN_INITIAL_CAPITAL),
            );
        }

        Self::check_dates(config, today, &mut errors);

        if !config.assets.use_all && config.assets.selected.is_empty() {
            errors.add(ConfigField::Assets, "Select at least one asset");
        }

        if !config.signals().has_entry() {
            errors.add(
                ConfigField::EntryConditions,
                "At least one entry condition is required",
            );
        }

        Self::check_conditions(config, &mut errors);
        Self::check_risk(config, &mut errors);

        errors
    }

    fn check_dates(config: &StrategyConfig, today: NaiveDate, errors: &mut ValidationErrors) {
        let earliest = config.data_source.earliest_date();
        let range = config.date_range;

        match range.start {
            None => errors.add(ConfigField::StartDate, "Start date is required"),
            Some(start) if start < earliest => errors.add(
                ConfigField::StartDate,
                format!("Start date cannot be before {}", earliest),
            ),
            Some(_) => {}
        }

        match range.end {
            None => errors.add(ConfigField::EndDate, "End date is required"),
            Some(end) if end > today => {
                errors.add(ConfigField::EndDate, "End date cannot be in the future")
            }
            Some(_) => {}
        }

        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start >= end {
                errors.add(ConfigField::EndDate, "End date must be after the start date");
            }
        }
    }

    fn check_conditions(config: &StrategyConfig, errors: &mut ValidationErrors) {
        let mut counters: HashMap<ConditionSlot, usize> = HashMap::new();
        for (slot, condition) in config.active_conditions() {
            let position = counters.entry(slot).or_insert(0);
            *position += 1;
            if let Err(e) = condition.validate() {
                errors.add(
                    ConfigField::Conditions,
                    format!("{} condition #{} ({}): {}", slot, position, condition.kind(), e),
                );
            }
        }
    }

    fn check_risk(config: &StrategyConfig, errors: &mut ValidationErrors) {
        if !config.fee_rate.is_finite() || !(0.0..=MAX_FEE_RATE).contains(&config.fee_rate) {
            errors.add(
                ConfigField::FeeRate,
                format!("Fee rate must be between 0 and {}%", MAX_FEE_RATE),
            );
        }

        let tp = &config.take_profit;
        if tp.enabled {
            if !is_positive(tp.target_profit) {
                errors.add(ConfigField::TakeProfit, "Target profit must be greater than 0");
            } else if tp.trailing && !is_positive(tp.trailing_deviation) {
                errors.add(
                    ConfigField::TakeProfit,
                    "Trailing deviation must be greater than 0",
                );
            }
        }

        let sl = &config.stop_loss;
        if sl.enabled && !is_positive(sl.value) {
            errors.add(ConfigField::StopLoss, "Stop loss must be greater than 0");
        }

        let so = &config.safety_orders;
        if so.enabled {
            let problem = if !is_positive(so.order_size) {
                Some("Safety order size must be greater than 0")
            } else if so.max_orders < 1 {
                Some("At least one safety order is required")
            } else if !is_positive(so.price_deviation) {
                Some("Price deviation must be greater than 0")
            } else if !is_positive(so.step_scale) {
                Some("Step scale must be greater than 0")
            } else if !is_positive(so.volume_scale) {
                Some("Volume scale must be greater than 0")
            } else {
                None
            };
            if let Some(message) = problem {
                errors.add(ConfigField::SafetyOrders, message);
            }
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// A configuration that passed validation, frozen for submission
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStrategy {
    config: StrategyConfig,
    start_date: NaiveDate,
    end_date: NaiveDate,
    base_order_size: f64,
}

impl ValidatedStrategy {
    pub fn new(config: StrategyConfig, today: NaiveDate) -> Result<Self, ValidationErrors> {
        let mut errors = ConfigValidator::validate(&config, today);
        if !errors.is_empty() {
            return Err(errors);
        }

        let (start_date, end_date) = match (config.date_range.start, config.date_range.end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                errors.add(ConfigField::StartDate, "Start date is required");
                return Err(errors);
            }
        };
        let base_order_size = match config.base_order_size() {
            Some(size) => size,
            None => {
                errors.add(
                    ConfigField::MaxConcurrentPositions,
                    "At least one concurrent position is required",
                );
                return Err(errors);
            }
        };

        Ok(Self {
            config,
            start_date,
            end_date,
            base_order_size,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        self.config.name.trim()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn base_order_size(&self) -> f64 {
        self.base_order_size
    }

    pub fn into_inner(self) -> StrategyConfig {
        self.config
    }
}
