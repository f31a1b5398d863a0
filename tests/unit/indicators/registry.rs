//! Unit tests for the per-kind parameter registry

use backtest_queue::indicators::registry::{RSI_LENGTH, RSI_VALUE, SIGNAL_TIMEFRAME};
use backtest_queue::indicators::{IndicatorError, ParamType};
use backtest_queue::models::{Comparator, Condition, IndicatorKind, IndicatorParams};
use serde_json::json;
use std::collections::BTreeSet;

#[test]
fn test_fresh_condition_has_exactly_declared_params() {
    for kind in IndicatorKind::ALL {
        let condition = Condition::new(kind);
        let actual: BTreeSet<String> = condition.params().to_subfields().keys().cloned().collect();
        let declared: BTreeSet<String> = kind.param_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(actual, declared, "{kind}");
    }
}

#[test]
fn test_defaults_match_declared_defaults() {
    for kind in IndicatorKind::ALL {
        assert_eq!(
            IndicatorParams::defaults(kind).to_subfields(),
            kind.default_subfields(),
            "{kind}"
        );
    }
}

#[test]
fn test_declared_defaults_pass_their_own_checks() {
    for kind in IndicatorKind::ALL {
        for def in kind.param_defs() {
            assert!(def.check(&def.default.to_value()).is_ok(), "{kind}.{}", def.name);
        }
    }
}

#[test]
fn test_rsi_declaration() {
    let names = IndicatorKind::Rsi.param_names();
    assert_eq!(names, vec![RSI_LENGTH, RSI_VALUE]);

    let length = IndicatorKind::Rsi.param_def(RSI_LENGTH).expect("rsi_length declared");
    assert!(matches!(length.param_type, ParamType::Integer { min: 2, max: 100 }));
    assert_eq!(length.default.to_value(), json!(14));
}

#[test]
fn test_external_signal_timeframe_param() {
    let def = IndicatorKind::ExternalSignal
        .param_def(SIGNAL_TIMEFRAME)
        .expect("signal_timeframe declared");
    assert!(matches!(def.param_type, ParamType::Timeframe));
    assert!(def.check(&json!("4h")).is_ok());
    assert!(def.check(&json!("3h")).is_err());
}

#[test]
fn test_from_name_uses_wire_names() {
    assert_eq!(IndicatorKind::from_name("RSI"), Ok(IndicatorKind::Rsi));
    assert_eq!(
        IndicatorKind::from_name("BollingerBands%B"),
        Ok(IndicatorKind::BollingerBandsPercentB)
    );
    assert_eq!(
        IndicatorKind::from_name("HeikinAshi"),
        Ok(IndicatorKind::SmoothedCandle)
    );
    assert!(matches!(
        IndicatorKind::from_name("Ichimoku"),
        Err(IndicatorError::UnknownIndicator(_))
    ));
}

#[test]
fn test_comparator_subsets() {
    assert_eq!(IndicatorKind::Rsi.default_comparator(), Comparator::LessThan);
    assert_eq!(
        IndicatorKind::MovingAverageCrossover.default_comparator(),
        Comparator::CrossingUp
    );
    assert!(IndicatorKind::MovingAverageCrossover.allows(Comparator::GreaterThan));

    for kind in [
        IndicatorKind::Macd,
        IndicatorKind::ParabolicSar,
        IndicatorKind::ExternalSignal,
        IndicatorKind::SmoothedCandle,
    ] {
        assert_eq!(
            kind.allowed_comparators(),
            &[Comparator::CrossingUp, Comparator::CrossingDown],
            "{kind}"
        );
    }
}
