//! Flat request body the backtest engine expects

use crate::models::condition::Condition;
use crate::models::strategy::{ConditionSet, DataSource, ProfitType, StopLossType};
use crate::strategies::validator::ValidatedStrategy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `reinvest_profit` is a percentage on the wire; the engine only understands all or nothing
pub const REINVEST_ALL: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPayload {
    pub strategy_name: String,
    pub pairs: Vec<String>,
    pub use_all_pairs: bool,
    pub data_source: DataSource,
    pub max_active_deals: u32,
    pub initial_balance: f64,
    pub base_order_size: f64,
    pub trading_fee: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_conditions: Option<Vec<Condition>>,
    #[serde(default)]
    pub safety_conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullish_entry_conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearish_entry_conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullish_exit_conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearish_exit_conditions: Option<Vec<Condition>>,

    pub price_change_active: bool,
    pub target_profit: f64,
    pub take_profit_type: ProfitType,
    pub trailing_toggle: bool,
    pub trailing_deviation: f64,

    pub stop_loss_toggle: bool,
    pub stop_loss_value: f64,
    pub stop_loss_type: StopLossType,

    pub safety_order_toggle: bool,
    pub safety_order_size: f64,
    pub max_safety_orders: u32,
    pub price_deviation: f64,
    pub safety_order_step_scale: f64,
    pub safety_order_volume_scale: f64,

    pub reinvest_profit: u8,
    pub min_daily_volume: f64,
    pub cooldown_between_deals: u32,
    pub close_deal_after_timeout: u32,
}

impl From<&ValidatedStrategy> for StrategyPayload {
    fn from(strategy: &ValidatedStrategy) -> Self {
        let config = strategy.config();

        let mut payload = StrategyPayload {
            strategy_name: strategy.name().to_string(),
            pairs: config.assets.selected.clone(),
            use_all_pairs: config.assets.use_all,
            data_source: config.data_source,
            max_active_deals: config.max_concurrent_positions,
            initial_balance: config.initial_capital,
            base_order_size: strategy.base_order_size(),
            trading_fee: config.fee_rate,
            start_date: strategy.start_date(),
            end_date: strategy.end_date(),
            entry_conditions: None,
            exit_conditions: None,
            safety_conditions: config.safety_conditions.clone(),
            bullish_entry_conditions: None,
            bearish_entry_conditions: None,
            bullish_exit_conditions: None,
            bearish_exit_conditions: None,
            price_change_active: config.take_profit.enabled,
            target_profit: config.take_profit.target_profit,
            take_profit_type: config.take_profit.kind,
            trailing_toggle: config.take_profit.trailing,
            trailing_deviation: config.take_profit.trailing_deviation,
            stop_loss_toggle: config.stop_loss.enabled,
            stop_loss_value: config.stop_loss.value,
            stop_loss_type: config.stop_loss.kind,
            safety_order_toggle: config.safety_orders.enabled,
            safety_order_size: config.safety_orders.order_size,
            max_safety_orders: config.safety_orders.max_orders,
            price_deviation: config.safety_orders.price_deviation,
            safety_order_step_scale: config.safety_orders.step_scale,
            safety_order_volume_scale: config.safety_orders.volume_scale,
            reinvest_profit: if config.reinvest_profit { REINVEST_ALL } else { 0 },
            min_daily_volume: config.min_daily_volume,
            cooldown_between_deals: config.cooldown_between_deals,
            close_deal_after_timeout: config.close_deal_after_timeout,
        };

        // Only the active mode's lists are sent
        match config.signals() {
            ConditionSet::Flat { entry, exit } => {
                payload.entry_conditions = Some(entry.clone());
                payload.exit_conditions = Some(exit.clone());
            }
            ConditionSet::MarketState {
                bullish_entry,
                bearish_entry,
                bullish_exit,
                bearish_exit,
            } => {
                payload.bullish_entry_conditions = Some(bullish_entry.clone());
                payload.bearish_entry_conditions = Some(bearish_entry.clone());
                payload.bullish_exit_conditions = Some(bullish_exit.clone());
                payload.bearish_exit_conditions = Some(bearish_exit.clone());
            }
        }

        payload
    }
}

impl From<ValidatedStrategy> for StrategyPayload {
    fn from(strategy: ValidatedStrategy) -> Self {
        StrategyPayload::from(&strategy)
    }
}
