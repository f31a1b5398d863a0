//! Parameter schema of every indicator kind

use crate::indicators::error::IndicatorError;
use crate::models::indicators::{Choice, IndicatorKind, Timeframe};
use serde_json::{Map, Value};

pub const RSI_LENGTH: &str = "rsi_length";
pub const RSI_VALUE: &str = "rsi_value";
pub const MA_TYPE: &str = "ma_type";
pub const FAST_MA: &str = "fast_ma";
pub const SLOW_MA: &str = "slow_ma";
pub const MACD_FAST_LENGTH: &str = "fast_length";
pub const MACD_SLOW_LENGTH: &str = "slow_length";
pub const MACD_SIGNAL_SMOOTHING: &str = "signal_smoothing";
pub const MACD_TRIGGER: &str = "macd_trigger";
pub const BB_LENGTH: &str = "bb_length";
pub const BB_DEVIATION: &str = "bb_deviation";
pub const BB_VALUE: &str = "bb_value";
pub const STOCH_K_LENGTH: &str = "k_length";
pub const STOCH_K_SMOOTHING: &str = "k_smoothing";
pub const STOCH_D_SMOOTHING: &str = "d_smoothing";
pub const STOCH_VALUE: &str = "stochastic_value";
pub const SAR_START: &str = "sar_start";
pub const SAR_INCREMENT: &str = "sar_increment";
pub const SAR_MAXIMUM: &str = "sar_maximum";
pub const SIGNAL_VALUE: &str = "signal_value";
pub const SIGNAL_TIMEFRAME: &str = "signal_timeframe";
pub const CONSECUTIVE_CANDLES: &str = "consecutive_candles";

pub const MA_TYPES: &[&str] = &["SMA", "EMA"];
pub const MACD_TRIGGERS: &[&str] = &["Signal Line", "Zero Line"];
pub const SIGNAL_RATINGS: &[&str] = &["Strong Buy", "Buy", "Neutral", "Sell", "Strong Sell"];

/// Value domain of a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamType {
    Integer { min: i64, max: i64 },
    Decimal { min: f64, max: f64 },
    Choice(&'static [&'static str]),
    Timeframe,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Integer(i64),
    Decimal(f64),
    Label(&'static str),
}

impl ParamDefault {
    pub fn to_value(&self) -> Value {
        match self {
            ParamDefault::Integer(v) => Value::from(*v),
            ParamDefault::Decimal(v) => Value::from(*v),
            ParamDefault::Label(v) => Value::from(*v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDef {
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: ParamDefault,
}

impl ParamDef {
    const fn integer(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name,
            param_type: ParamType::Integer { min, max },
            default: ParamDefault::Integer(default),
        }
    }

    const fn decimal(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            param_type: ParamType::Decimal { min, max },
            default: ParamDefault::Decimal(default),
        }
    }

    const fn choice(name: &'static str, labels: &'static [&'static str], default: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::Choice(labels),
            default: ParamDefault::Label(default),
        }
    }

    const fn timeframe(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::Timeframe,
            default: ParamDefault::Label(default),
        }
    }

    /// Check a raw value against this parameter's type and domain
    pub fn check(&self, value: &Value) -> Result<(), IndicatorError> {
        match self.param_type {
            ParamType::Integer { min, max } => {
                let v = integer_value(self.name, value)?;
                if v < min || v > max {
                    return Err(IndicatorError::OutOfRange {
                        param: self.name.to_string(),
                        value: v as f64,
                        min: min as f64,
                        max: max as f64,
                    });
                }
                Ok(())
            }
            ParamType::Decimal { min, max } => {
                let v = decimal_value(self.name, value)?;
                if v < min || v > max {
                    return Err(IndicatorError::OutOfRange {
                        param: self.name.to_string(),
                        value: v,
                        min,
                        max,
                    });
                }
                Ok(())
            }
            ParamType::Choice(labels) => {
                let label = label_value(self.name, value)?;
                if labels.contains(&label) {
                    Ok(())
                } else {
                    Err(IndicatorError::UnsupportedChoice {
                        param: self.name.to_string(),
                        value: label.to_string(),
                    })
                }
            }
            ParamType::Timeframe => {
                let label = label_value(self.name, value)?;
                Timeframe::from_label(label).map(|_| ()).ok_or_else(|| {
                    IndicatorError::UnsupportedChoice {
                        param: self.name.to_string(),
                        value: label.to_string(),
                    }
                })
            }
        }
    }
}

/// Integers arrive either as JSON integers or as integral decimals (`14.0`)
pub(crate) fn integer_value(param: &str, value: &Value) -> Result<i64, IndicatorError> {
    if let Some(v) = value.as_i64() {
        return Ok(v);
    }
    match value.as_f64() {
        Some(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
        _ => Err(IndicatorError::InvalidType {
            param: param.to_string(),
            expected: "an integer",
            found: value.to_string(),
        }),
    }
}

pub(crate) fn decimal_value(param: &str, value: &Value) -> Result<f64, IndicatorError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IndicatorError::InvalidType {
            param: param.to_string(),
            expected: "a number",
            found: value.to_string(),
        })
}

pub(crate) fn label_value<'a>(param: &str, value: &'a Value) -> Result<&'a str, IndicatorError> {
    value.as_str().ok_or_else(|| IndicatorError::InvalidType {
        param: param.to_string(),
        expected: "a text label",
        found: value.to_string(),
    })
}

const RSI_PARAMS: &[ParamDef] = &[
    ParamDef::integer(RSI_LENGTH, 2, 100, 14),
    ParamDef::decimal(RSI_VALUE, 0.0, 100.0, 30.0),
];

const MA_PARAMS: &[ParamDef] = &[
    ParamDef::choice(MA_TYPE, MA_TYPES, "EMA"),
    ParamDef::integer(FAST_MA, 1, 500, 50),
    ParamDef::integer(SLOW_MA, 1, 500, 200),
];

const MACD_PARAMS: &[ParamDef] = &[
    ParamDef::integer(MACD_FAST_LENGTH, 1, 200, 12),
    ParamDef::integer(MACD_SLOW_LENGTH, 1, 200, 26),
    ParamDef::integer(MACD_SIGNAL_SMOOTHING, 1, 100, 9),
    ParamDef::choice(MACD_TRIGGER, MACD_TRIGGERS, "Signal Line"),
];

const BOLLINGER_PARAMS: &[ParamDef] = &[
    ParamDef::integer(BB_LENGTH, 1, 200, 20),
    ParamDef::decimal(BB_DEVIATION, 0.1, 5.0, 2.0),
    ParamDef::decimal(BB_VALUE, -100.0, 200.0, 0.0),
];

const STOCHASTIC_PARAMS: &[ParamDef] = &[
    ParamDef::integer(STOCH_K_LENGTH, 1, 100, 14),
    ParamDef::integer(STOCH_K_SMOOTHING, 1, 20, 3),
    ParamDef::integer(STOCH_D_SMOOTHING, 1, 20, 3),
    ParamDef::decimal(STOCH_VALUE, 0.0, 100.0, 20.0),
];

const PARABOLIC_SAR_PARAMS: &[ParamDef] = &[
    ParamDef::decimal(SAR_START, 0.001, 1.0, 0.02),
    ParamDef::decimal(SAR_INCREMENT, 0.001, 1.0, 0.02),
    ParamDef::decimal(SAR_MAXIMUM, 0.01, 1.0, 0.2),
];

const EXTERNAL_SIGNAL_PARAMS: &[ParamDef] = &[
    ParamDef::choice(SIGNAL_VALUE, SIGNAL_RATINGS, "Buy"),
    ParamDef::timeframe(SIGNAL_TIMEFRAME, "1h"),
];

const SMOOTHED_CANDLE_PARAMS: &[ParamDef] = &[ParamDef::integer(CONSECUTIVE_CANDLES, 1, 10, 1)];

impl IndicatorKind {
    /// Ordered parameter definitions declared by this kind
    pub fn param_defs(&self) -> &'static [ParamDef] {
        match self {
            IndicatorKind::Rsi => RSI_PARAMS,
            IndicatorKind::MovingAverageCrossover => MA_PARAMS,
            IndicatorKind::Macd => MACD_PARAMS,
            IndicatorKind::BollingerBandsPercentB => BOLLINGER_PARAMS,
            IndicatorKind::Stochastic => STOCHASTIC_PARAMS,
            IndicatorKind::ParabolicSar => PARABOLIC_SAR_PARAMS,
            IndicatorKind::ExternalSignal => EXTERNAL_SIGNAL_PARAMS,
            IndicatorKind::SmoothedCandle => SMOOTHED_CANDLE_PARAMS,
        }
    }

    pub fn param_def(&self, name: &str) -> Option<&'static ParamDef> {
        self.param_defs().iter().find(|def| def.name == name)
    }

    pub fn param_names(&self) -> Vec<&'static str> {
        self.param_defs().iter().map(|def| def.name).collect()
    }

    /// Default subfield map, as a fresh condition of this kind would serialize it
    pub fn default_subfields(&self) -> Map<String, Value> {
        self.param_defs()
            .iter()
            .map(|def| (def.name.to_string(), def.default.to_value()))
            .collect()
    }

    pub fn from_name(name: &str) -> Result<Self, IndicatorError> {
        IndicatorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| IndicatorError::UnknownIndicator(name.to_string()))
    }
}
