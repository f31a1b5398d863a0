//! Unit tests for single conditions and their wire form

use backtest_queue::indicators::IndicatorError;
use backtest_queue::models::indicators::{MovingAverageParams, RsiParams};
use backtest_queue::models::{Comparator, Condition, IndicatorKind, IndicatorParams, Timeframe};
use serde_json::json;

#[test]
fn test_new_condition_uses_kind_defaults() {
    let condition = Condition::new(IndicatorKind::Macd);
    assert_eq!(condition.kind(), IndicatorKind::Macd);
    assert_eq!(condition.timeframe(), Timeframe::OneHour);
    assert_eq!(condition.comparator(), Comparator::CrossingUp);
    assert!(condition.validate().is_ok());
}

#[test]
fn test_set_kind_replaces_every_parameter() {
    let mut condition = Condition::new(IndicatorKind::Rsi);
    *condition.params_mut() = IndicatorParams::Rsi(RsiParams {
        length: 21,
        value: 70.0,
    });
    condition.set_timeframe(Timeframe::FourHours);

    for kind in IndicatorKind::ALL {
        condition.set_kind(kind);
        assert_eq!(condition.params(), &IndicatorParams::defaults(kind));
        assert_eq!(condition.timeframe(), Timeframe::FourHours);
    }
}

#[test]
fn test_set_kind_resets_disallowed_comparator() {
    let mut condition = Condition::new(IndicatorKind::Rsi);
    condition.set_comparator(Comparator::GreaterThan).unwrap();

    condition.set_kind(IndicatorKind::Macd);
    assert_eq!(condition.comparator(), Comparator::CrossingUp);

    condition.set_comparator(Comparator::CrossingDown).unwrap();
    condition.set_kind(IndicatorKind::Stochastic);
    assert_eq!(condition.comparator(), Comparator::CrossingDown);
}

#[test]
fn test_set_comparator_rejects_unsupported() {
    let mut condition = Condition::new(IndicatorKind::ParabolicSar);
    let err = condition.set_comparator(Comparator::LessThan).unwrap_err();
    assert!(matches!(err, IndicatorError::UnsupportedComparator { .. }));
    assert_eq!(condition.comparator(), Comparator::CrossingUp);
}

#[test]
fn test_serializes_as_indicator_and_subfields() {
    let condition = Condition::with_parts(
        Timeframe::FifteenMinutes,
        Comparator::CrossingDown,
        IndicatorParams::MovingAverageCrossover(MovingAverageParams::default()),
    )
    .unwrap();

    let value = serde_json::to_value(&condition).unwrap();
    assert_eq!(
        value,
        json!({
            "indicator": "MA",
            "subfields": {
                "timeframe": "15m",
                "condition": "Crossing Down",
                "ma_type": "EMA",
                "fast_ma": 50,
                "slow_ma": 200
            }
        })
    );

    let back: Condition = serde_json::from_value(value).unwrap();
    assert_eq!(back, condition);
}

#[test]
fn test_deserialize_rejects_unknown_parameter() {
    let value = json!({
        "indicator": "MACD",
        "subfields": {
            "timeframe": "1h",
            "condition": "Crossing Up",
            "fast_length": 12,
            "slow_length": 26,
            "signal_smoothing": 9,
            "macd_trigger": "Signal Line",
            "rsi_length": 14
        }
    });
    let err = serde_json::from_value::<Condition>(value).unwrap_err();
    assert!(err.to_string().contains("rsi_length"));
}

#[test]
fn test_deserialize_rejects_missing_parameter() {
    let value = json!({
        "indicator": "RSI",
        "subfields": { "timeframe": "1h", "condition": "Less Than", "rsi_length": 14 }
    });
    let err = serde_json::from_value::<Condition>(value).unwrap_err();
    assert!(err.to_string().contains("rsi_value"));
}

#[test]
fn test_deserialize_rejects_comparator_outside_subset() {
    let value = json!({
        "indicator": "HeikinAshi",
        "subfields": { "timeframe": "1h", "condition": "Greater Than", "consecutive_candles": 2 }
    });
    assert!(serde_json::from_value::<Condition>(value).is_err());
}

#[test]
fn test_deserialize_rejects_unknown_timeframe() {
    let value = json!({
        "indicator": "RSI",
        "subfields": { "timeframe": "3h", "condition": "Less Than", "rsi_length": 14, "rsi_value": 30 }
    });
    let err = serde_json::from_value::<Condition>(value).unwrap_err();
    assert!(err.to_string().contains("3h"));
}
