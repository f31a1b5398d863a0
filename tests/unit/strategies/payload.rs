//! Unit tests for the engine request body

use backtest_queue::models::{ConditionMode, ConditionSlot, IndicatorKind, StrategyConfig};
use backtest_queue::strategies::payload::REINVEST_ALL;
use backtest_queue::strategies::{StrategyPayload, ValidatedStrategy};
use chrono::NaiveDate;
use serde_json::json;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn config() -> StrategyConfig {
    let mut config = StrategyConfig::new(today());
    config.name = "RSI dip".to_string();
    config.max_concurrent_positions = 1;
    config.initial_capital = 10_000.0;
    config
}

fn payload_json(config: StrategyConfig) -> serde_json::Value {
    let strategy = ValidatedStrategy::new(config, today()).unwrap();
    serde_json::to_value(StrategyPayload::from(&strategy)).unwrap()
}

#[test]
fn test_flat_payload_fields() {
    let value = payload_json(config());

    assert_eq!(value["strategy_name"], json!("RSI dip"));
    assert_eq!(value["pairs"], json!(["BTC/USDT"]));
    assert_eq!(value["use_all_pairs"], json!(false));
    assert_eq!(value["data_source"], json!("spot"));
    assert_eq!(value["max_active_deals"], json!(1));
    assert_eq!(value["base_order_size"], json!(10_000.0));
    assert_eq!(value["start_date"], json!("2024-03-03"));
    assert_eq!(value["end_date"], json!("2024-06-01"));
    assert_eq!(value["take_profit_type"], json!("percentage"));
    assert_eq!(value["entry_conditions"][0]["indicator"], json!("RSI"));
    assert_eq!(value["exit_conditions"], json!([]));
    assert_eq!(value["safety_conditions"], json!([]));
}

#[test]
fn test_inactive_mode_lists_are_omitted() {
    let flat = payload_json(config());
    let object = flat.as_object().unwrap();
    for key in [
        "bullish_entry_conditions",
        "bearish_entry_conditions",
        "bullish_exit_conditions",
        "bearish_exit_conditions",
    ] {
        assert!(!object.contains_key(key), "{key}");
    }

    let mut market = config();
    market.set_mode(ConditionMode::MarketState);
    market
        .add_condition(ConditionSlot::BullishEntry, IndicatorKind::Macd)
        .unwrap();
    let value = payload_json(market);
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("entry_conditions"));
    assert!(!object.contains_key("exit_conditions"));
    assert_eq!(value["bullish_entry_conditions"][0]["indicator"], json!("MACD"));
    assert_eq!(value["bearish_exit_conditions"], json!([]));
}

#[test]
fn test_reinvest_profit_is_all_or_nothing() {
    assert_eq!(payload_json(config())["reinvest_profit"], json!(0));

    let mut reinvesting = config();
    reinvesting.reinvest_profit = true;
    assert_eq!(
        payload_json(reinvesting)["reinvest_profit"],
        json!(REINVEST_ALL)
    );
}

#[test]
fn test_base_order_size_split_across_positions() {
    let mut split = config();
    split.max_concurrent_positions = 4;
    split.initial_capital = 1_000.0;
    assert_eq!(payload_json(split)["base_order_size"], json!(250.0));
}

#[test]
fn test_name_is_trimmed() {
    let mut padded = config();
    padded.name = "  RSI dip ".to_string();
    assert_eq!(payload_json(padded)["strategy_name"], json!("RSI dip"));
}
