use crate::indicators::error::IndicatorError;
use crate::indicators::registry::*;
use crate::models::indicators::*;
use serde_json::{Map, Value};

fn read<'a>(
    kind: IndicatorKind,
    data: &'a Map<String, Value>,
    name: &str,
) -> Result<&'a Value, IndicatorError> {
    data.get(name).ok_or_else(|| IndicatorError::MissingParameter {
        kind,
        param: name.to_string(),
    })
}

fn read_u32(kind: IndicatorKind, data: &Map<String, Value>, name: &str) -> Result<u32, IndicatorError> {
    let value = read(kind, data, name)?;
    let v = integer_value(name, value)?;
    u32::try_from(v).map_err(|_| IndicatorError::InvalidType {
        param: name.to_string(),
        expected: "a non-negative integer",
        found: value.to_string(),
    })
}

fn read_f64(kind: IndicatorKind, data: &Map<String, Value>, name: &str) -> Result<f64, IndicatorError> {
    decimal_value(name, read(kind, data, name)?)
}

fn read_choice<T: Choice>(
    kind: IndicatorKind,
    data: &Map<String, Value>,
    name: &str,
) -> Result<T, IndicatorError> {
    let label = label_value(name, read(kind, data, name)?)?;
    T::from_label(label).ok_or_else(|| IndicatorError::UnsupportedChoice {
        param: name.to_string(),
        value: label.to_string(),
    })
}

/// The key set must equal the kind's declared parameter set exactly
fn check_keys(kind: IndicatorKind, data: &Map<String, Value>) -> Result<(), IndicatorError> {
    if let Some(unknown) = data.keys().find(|key| kind.param_def(key).is_none()) {
        return Err(IndicatorError::UnknownParameter {
            kind,
            param: unknown.clone(),
        });
    }
    if let Some(missing) = kind.param_defs().iter().find(|def| !data.contains_key(def.name)) {
        return Err(IndicatorError::MissingParameter {
            kind,
            param: missing.name.to_string(),
        });
    }
    for def in kind.param_defs() {
        def.check(&data[def.name])?;
    }
    Ok(())
}

impl IndicatorParams {
    /// Parse the indicator-specific part of a condition's subfields
    pub fn from_subfields(
        kind: IndicatorKind,
        data: &Map<String, Value>,
    ) -> Result<Self, IndicatorError> {
        check_keys(kind, data)?;

        let params = match kind {
            IndicatorKind::Rsi => IndicatorParams::Rsi(RsiParams {
                length: read_u32(kind, data, RSI_LENGTH)?,
                value: read_f64(kind, data, RSI_VALUE)?,
            }),
            IndicatorKind::MovingAverageCrossover => {
                IndicatorParams::MovingAverageCrossover(MovingAverageParams {
                    ma_type: read_choice(kind, data, MA_TYPE)?,
                    fast: read_u32(kind, data, FAST_MA)?,
                    slow: read_u32(kind, data, SLOW_MA)?,
                })
            }
            IndicatorKind::Macd => IndicatorParams::Macd(MacdParams {
                fast_length: read_u32(kind, data, MACD_FAST_LENGTH)?,
                slow_length: read_u32(kind, data, MACD_SLOW_LENGTH)?,
                signal_smoothing: read_u32(kind, data, MACD_SIGNAL_SMOOTHING)?,
                trigger: read_choice(kind, data, MACD_TRIGGER)?,
            }),
            IndicatorKind::BollingerBandsPercentB => {
                IndicatorParams::BollingerBandsPercentB(BollingerParams {
                    length: read_u32(kind, data, BB_LENGTH)?,
                    deviation: read_f64(kind, data, BB_DEVIATION)?,
                    value: read_f64(kind, data, BB_VALUE)?,
                })
            }
            IndicatorKind::Stochastic => IndicatorParams::Stochastic(StochasticParams {
                k_length: read_u32(kind, data, STOCH_K_LENGTH)?,
                k_smoothing: read_u32(kind, data, STOCH_K_SMOOTHING)?,
                d_smoothing: read_u32(kind, data, STOCH_D_SMOOTHING)?,
                value: read_f64(kind, data, STOCH_VALUE)?,
            }),
            IndicatorKind::ParabolicSar => IndicatorParams::ParabolicSar(ParabolicSarParams {
                start: read_f64(kind, data, SAR_START)?,
                increment: read_f64(kind, data, SAR_INCREMENT)?,
                maximum: read_f64(kind, data, SAR_MAXIMUM)?,
            }),
            IndicatorKind::ExternalSignal => {
                IndicatorParams::ExternalSignal(ExternalSignalParams {
                    signal: read_choice(kind, data, SIGNAL_VALUE)?,
                    timeframe: read_choice(kind, data, SIGNAL_TIMEFRAME)?,
                })
            }
            IndicatorKind::SmoothedCandle => {
                IndicatorParams::SmoothedCandle(SmoothedCandleParams {
                    consecutive_candles: read_u32(kind, data, CONSECUTIVE_CANDLES)?,
                })
            }
        };

        params.check_consistency()?;
        Ok(params)
    }

    /// Flat `{parameter: value}` map holding exactly the declared parameters
    pub fn to_subfields(&self) -> Map<String, Value> {
        let pairs: Vec<(&str, Value)> = match self {
            IndicatorParams::Rsi(p) => vec![
                (RSI_LENGTH, p.length.into()),
                (RSI_VALUE, p.value.into()),
            ],
            IndicatorParams::MovingAverageCrossover(p) => vec![
                (MA_TYPE, p.ma_type.label().into()),
                (FAST_MA, p.fast.into()),
                (SLOW_MA, p.slow.into()),
            ],
            IndicatorParams::Macd(p) => vec![
                (MACD_FAST_LENGTH, p.fast_length.into()),
                (MACD_SLOW_LENGTH, p.slow_length.into()),
                (MACD_SIGNAL_SMOOTHING, p.signal_smoothing.into()),
                (MACD_TRIGGER, p.trigger.label().into()),
            ],
            IndicatorParams::BollingerBandsPercentB(p) => vec![
                (BB_LENGTH, p.length.into()),
                (BB_DEVIATION, p.deviation.into()),
                (BB_VALUE, p.value.into()),
            ],
            IndicatorParams::Stochastic(p) => vec![
                (STOCH_K_LENGTH, p.k_length.into()),
                (STOCH_K_SMOOTHING, p.k_smoothing.into()),
                (STOCH_D_SMOOTHING, p.d_smoothing.into()),
                (STOCH_VALUE, p.value.into()),
            ],
            IndicatorParams::ParabolicSar(p) => vec![
                (SAR_START, p.start.into()),
                (SAR_INCREMENT, p.increment.into()),
                (SAR_MAXIMUM, p.maximum.into()),
            ],
            IndicatorParams::ExternalSignal(p) => vec![
                (SIGNAL_VALUE, p.signal.label().into()),
                (SIGNAL_TIMEFRAME, p.timeframe.label().into()),
            ],
            IndicatorParams::SmoothedCandle(p) => {
                vec![(CONSECUTIVE_CANDLES, p.consecutive_candles.into())]
            }
        };

        pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}
