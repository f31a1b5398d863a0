//! Unit tests for configuration validation

use backtest_queue::models::indicators::RsiParams;
use backtest_queue::models::strategy::DataSource;
use backtest_queue::models::{
    ConditionMode, ConditionSlot, IndicatorKind, IndicatorParams, StrategyConfig,
};
use backtest_queue::strategies::{ConfigField, ConfigValidator, ValidatedStrategy};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 1)
}

fn valid_config() -> StrategyConfig {
    let mut config = StrategyConfig::new(today());
    config.name = "Trend follower".to_string();
    config
}

#[test]
fn test_valid_config_has_no_errors() {
    let errors = ConfigValidator::validate(&valid_config(), today());
    assert!(errors.is_empty(), "{errors}");
    assert!(ValidatedStrategy::new(valid_config(), today()).is_ok());
}

#[test]
fn test_empty_name_zero_positions_no_entries() {
    let mut config = StrategyConfig::new(today());
    config.name = "   ".to_string();
    config.max_concurrent_positions = 0;
    config.remove_condition(ConditionSlot::Entry, 0).unwrap();

    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(
        errors.fields(),
        vec![
            ConfigField::Name,
            ConfigField::MaxConcurrentPositions,
            ConfigField::EntryConditions
        ]
    );
    assert_eq!(errors.first_invalid(), Some(ConfigField::Name));
}

#[test]
fn test_fixing_a_field_removes_only_that_error() {
    let mut config = StrategyConfig::new(today());
    config.max_concurrent_positions = 0;
    config.initial_capital = 50.0;

    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(errors.len(), 3);

    config.initial_capital = 100.0;
    let errors = ConfigValidator::validate(&config, today());
    assert!(!errors.contains(ConfigField::InitialCapital));
    assert!(errors.contains(ConfigField::Name));
    assert!(errors.contains(ConfigField::MaxConcurrentPositions));

    config.name = "Fixed".to_string();
    config.max_concurrent_positions = 2;
    assert!(ConfigValidator::validate(&config, today()).is_empty());
}

#[test]
fn test_capital_must_be_finite_and_at_least_minimum() {
    let mut config = valid_config();
    for capital in [99.99, f64::NAN, f64::INFINITY, -5.0] {
        config.initial_capital = capital;
        let errors = ConfigValidator::validate(&config, today());
        assert_eq!(errors.fields(), vec![ConfigField::InitialCapital], "{capital}");
    }
}

#[test]
fn test_date_rules() {
    let mut config = valid_config();

    config.date_range.start = None;
    config.date_range.end = None;
    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(errors.fields(), vec![ConfigField::StartDate, ConfigField::EndDate]);

    config.date_range.start = Some(date(2024, 5, 1));
    config.date_range.end = Some(date(2024, 5, 1));
    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(errors.fields(), vec![ConfigField::EndDate]);

    config.date_range.end = Some(date(2024, 6, 2));
    let errors = ConfigValidator::validate(&config, today());
    assert!(errors.get(ConfigField::EndDate).unwrap().contains("future"));

    config.date_range.end = Some(today());
    config.date_range.start = Some(date(2017, 8, 16));
    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(errors.fields(), vec![ConfigField::StartDate]);
}

#[test]
fn test_earliest_date_depends_on_data_source() {
    let mut config = valid_config();
    config.date_range.start = Some(date(2018, 1, 1));
    assert!(ConfigValidator::validate(&config, today()).is_empty());

    config.data_source = DataSource::Futures;
    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(errors.fields(), vec![ConfigField::StartDate]);

    config.date_range.start = Some(date(2019, 9, 8));
    assert!(ConfigValidator::validate(&config, today()).is_empty());
}

#[test]
fn test_assets_required_unless_use_all() {
    let mut config = valid_config();
    config.assets.selected.clear();
    assert_eq!(
        ConfigValidator::validate(&config, today()).fields(),
        vec![ConfigField::Assets]
    );

    config.assets.use_all = true;
    assert!(ConfigValidator::validate(&config, today()).is_empty());
}

#[test]
fn test_market_state_needs_one_entry_list() {
    let mut config = valid_config();
    config.set_mode(ConditionMode::MarketState);
    assert_eq!(
        ConfigValidator::validate(&config, today()).fields(),
        vec![ConfigField::EntryConditions]
    );

    config
        .add_condition(ConditionSlot::BearishEntry, IndicatorKind::Stochastic)
        .unwrap();
    assert!(ConfigValidator::validate(&config, today()).is_empty());
}

#[test]
fn test_out_of_range_condition_is_reported() {
    let mut config = valid_config();
    *config
        .condition_mut(ConditionSlot::Entry, 0)
        .unwrap()
        .params_mut() = IndicatorParams::Rsi(RsiParams {
        length: 1,
        value: 30.0,
    });

    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(errors.fields(), vec![ConfigField::Conditions]);
    assert!(errors.get(ConfigField::Conditions).unwrap().contains("rsi_length"));
}

#[test]
fn test_risk_parameters_checked_when_enabled() {
    let mut config = valid_config();
    config.fee_rate = 12.0;
    config.take_profit.target_profit = 0.0;
    config.stop_loss.value = -1.0;
    config.safety_orders.max_orders = 0;

    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(
        errors.fields(),
        vec![ConfigField::FeeRate, ConfigField::TakeProfit]
    );

    config.stop_loss.enabled = true;
    config.safety_orders.enabled = true;
    let errors = ConfigValidator::validate(&config, today());
    assert_eq!(
        errors.fields(),
        vec![
            ConfigField::FeeRate,
            ConfigField::TakeProfit,
            ConfigField::StopLoss,
            ConfigField::SafetyOrders
        ]
    );
}

#[test]
fn test_validated_strategy_freezes_derived_values() {
    let mut config = valid_config();
    config.max_concurrent_positions = 1;
    config.initial_capital = 10_000.0;
    config.name = "  Padded  ".to_string();

    let strategy = ValidatedStrategy::new(config, today()).unwrap();
    assert_eq!(strategy.base_order_size(), 10_000.0);
    assert_eq!(strategy.name(), "Padded");
    assert_eq!(strategy.end_date(), today());
}

#[test]
fn test_validated_strategy_rejects_invalid_config() {
    let errors = ValidatedStrategy::new(StrategyConfig::new(today()), today()).unwrap_err();
    assert_eq!(errors.fields(), vec![ConfigField::Name]);
    assert_eq!(errors.to_map().get("name").map(String::as_str), errors.get(ConfigField::Name));
}
