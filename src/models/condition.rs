//! A single indicator condition inside a strategy's condition list

use crate::indicators::error::IndicatorError;
use crate::indicators::validation::validate_comparator;
use crate::models::indicators::{Choice, Comparator, IndicatorKind, IndicatorParams, Timeframe};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TIMEFRAME_FIELD: &str = "timeframe";
pub const COMPARATOR_FIELD: &str = "condition";

/// One indicator bound to a timeframe, a comparator and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConditionWire", into = "ConditionWire")]
pub struct Condition {
    timeframe: Timeframe,
    comparator: Comparator,
    params: IndicatorParams,
}

impl Condition {
    /// Fresh condition with the kind's default comparator and parameters
    pub fn new(kind: IndicatorKind) -> Self {
        Self {
            timeframe: Timeframe::default(),
            comparator: kind.default_comparator(),
            params: IndicatorParams::defaults(kind),
        }
    }

    /// Build from explicit parts, rejecting comparators the kind does not support
    pub fn with_parts(
        timeframe: Timeframe,
        comparator: Comparator,
        params: IndicatorParams,
    ) -> Result<Self, IndicatorError> {
        validate_comparator(params.kind(), comparator)?;
        Ok(Self {
            timeframe,
            comparator,
            params,
        })
    }

    pub fn kind(&self) -> IndicatorKind {
        self.params.kind()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut IndicatorParams {
        &mut self.params
    }

    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
    }

    pub fn set_comparator(&mut self, comparator: Comparator) -> Result<(), IndicatorError> {
        validate_comparator(self.kind(), comparator)?;
        self.comparator = comparator;
        Ok(())
    }

    /// Switch indicator kind. Parameters are never carried across kinds;
    /// the comparator survives only if the new kind allows it.
    pub fn set_kind(&mut self, kind: IndicatorKind) {
        self.params = IndicatorParams::defaults(kind);
        if !kind.allows(self.comparator) {
            self.comparator = kind.default_comparator();
        }
    }

    /// Comparator support plus parameter domains
    pub fn validate(&self) -> Result<(), IndicatorError> {
        validate_comparator(self.kind(), self.comparator)?;
        self.params.validate()
    }

    /// `{timeframe, condition, ...params}` as sent to the engine
    pub fn subfields(&self) -> Map<String, Value> {
        let mut subfields = Map::new();
        subfields.insert(TIMEFRAME_FIELD.to_string(), self.timeframe.label().into());
        subfields.insert(COMPARATOR_FIELD.to_string(), self.comparator.label().into());
        subfields.extend(self.params.to_subfields());
        subfields
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConditionWire {
    indicator: IndicatorKind,
    #[serde(default)]
    subfields: Map<String, Value>,
}

impl From<Condition> for ConditionWire {
    fn from(condition: Condition) -> Self {
        Self {
            indicator: condition.kind(),
            subfields: condition.subfields(),
        }
    }
}

impl TryFrom<ConditionWire> for Condition {
    type Error = IndicatorError;

    fn try_from(wire: ConditionWire) -> Result<Self, Self::Error> {
        let kind = wire.indicator;
        let mut subfields = wire.subfields;

        let timeframe = take_label::<Timeframe>(kind, &mut subfields, TIMEFRAME_FIELD)?;
        let comparator = take_label::<Comparator>(kind, &mut subfields, COMPARATOR_FIELD)?;
        let params = IndicatorParams::from_subfields(kind, &subfields)?;

        Condition::with_parts(timeframe, comparator, params)
    }
}

fn take_label<T: Choice>(
    kind: IndicatorKind,
    subfields: &mut Map<String, Value>,
    field: &str,
) -> Result<T, IndicatorError> {
    let value = subfields
        .remove(field)
        .ok_or_else(|| IndicatorError::MissingParameter {
            kind,
            param: field.to_string(),
        })?;
    let label = value.as_str().ok_or_else(|| IndicatorError::InvalidType {
        param: field.to_string(),
        expected: "a text label",
        found: value.to_string(),
    })?;
    T::from_label(label).ok_or_else(|| IndicatorError::UnsupportedChoice {
        param: field.to_string(),
        value: label.to_string(),
    })
}
