//! Strategy configuration aggregate

use crate::indicators::error::IndicatorError;
use crate::models::condition::Condition;
use crate::models::indicators::IndicatorKind;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MIN_INITIAL_CAPITAL: f64 = 100.0;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// Market data backing the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Spot,
    Futures,
}

impl DataSource {
    /// Earliest date the data source can serve candles for
    pub fn earliest_date(&self) -> NaiveDate {
        let (y, m, d) = match self {
            DataSource::Spot => (2017, 8, 17),
            DataSource::Futures => (2019, 9, 8),
        };
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSelection {
    pub use_all: bool,
    #[serde(default)]
    pub selected: Vec<String>,
}

impl Default for AssetSelection {
    fn default() -> Self {
        Self {
            use_all: false,
            selected: vec!["BTC/USDT".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// The default window ending today
    pub fn trailing(today: NaiveDate) -> Self {
        Self::new(today - Duration::days(DEFAULT_LOOKBACK_DAYS), today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitType {
    #[default]
    Percentage,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TakeProfit {
    pub enabled: bool,
    pub target_profit: f64,
    pub kind: ProfitType,
    pub trailing: bool,
    pub trailing_deviation: f64,
}

impl Default for TakeProfit {
    fn default() -> Self {
        Self {
            enabled: true,
            target_profit: 2.0,
            kind: ProfitType::Percentage,
            trailing: false,
            trailing_deviation: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopLossType {
    #[default]
    Fixed,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLoss {
    pub enabled: bool,
    pub value: f64,
    pub kind: StopLossType,
}

impl Default for StopLoss {
    fn default() -> Self {
        Self {
            enabled: false,
            value: 5.0,
            kind: StopLossType::Fixed,
        }
    }
}

/// Averaging orders placed when price moves against an open deal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyOrders {
    pub enabled: bool,
    pub order_size: f64,
    pub max_orders: u32,
    pub price_deviation: f64,
    pub step_scale: f64,
    pub volume_scale: f64,
}

impl Default for SafetyOrders {
    fn default() -> Self {
        Self {
            enabled: false,
            order_size: 10.0,
            max_orders: 3,
            price_deviation: 1.0,
            step_scale: 1.0,
            volume_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionMode {
    Flat,
    MarketState,
}

/// Entry/exit lists; either one flat pair or per-market-state variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConditionSet {
    Flat {
        #[serde(default)]
        entry: Vec<Condition>,
        #[serde(default)]
        exit: Vec<Condition>,
    },
    MarketState {
        #[serde(default)]
        bullish_entry: Vec<Condition>,
        #[serde(default)]
        bearish_entry: Vec<Condition>,
        #[serde(default)]
        bullish_exit: Vec<Condition>,
        #[serde(default)]
        bearish_exit: Vec<Condition>,
    },
}

impl ConditionSet {
    pub fn empty(mode: ConditionMode) -> Self {
        match mode {
            ConditionMode::Flat => ConditionSet::Flat {
                entry: Vec::new(),
                exit: Vec::new(),
            },
            ConditionMode::MarketState => ConditionSet::MarketState {
                bullish_entry: Vec::new(),
                bearish_entry: Vec::new(),
                bullish_exit: Vec::new(),
                bearish_exit: Vec::new(),
            },
        }
    }

    pub fn mode(&self) -> ConditionMode {
        match self {
            ConditionSet::Flat { .. } => ConditionMode::Flat,
            ConditionSet::MarketState { .. } => ConditionMode::MarketState,
        }
    }

    /// True when at least one entry condition exists in the active mode
    pub fn has_entry(&self) -> bool {
        match self {
            ConditionSet::Flat { entry, .. } => !entry.is_empty(),
            ConditionSet::MarketState {
                bullish_entry,
                bearish_entry,
                ..
            } => !bullish_entry.is_empty() || !bearish_entry.is_empty(),
        }
    }
}

impl Default for ConditionSet {
    fn default() -> Self {
        ConditionSet::Flat {
            entry: vec![Condition::new(IndicatorKind::Rsi)],
            exit: Vec::new(),
        }
    }
}

/// Condition lists a user can add to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionSlot {
    Entry,
    Exit,
    Safety,
    BullishEntry,
    BearishEntry,
    BullishExit,
    BearishExit,
}

impl ConditionSlot {
    pub const ALL: [ConditionSlot; 7] = [
        ConditionSlot::Entry,
        ConditionSlot::Exit,
        ConditionSlot::Safety,
        ConditionSlot::BullishEntry,
        ConditionSlot::BearishEntry,
        ConditionSlot::BullishExit,
        ConditionSlot::BearishExit,
    ];
}

impl fmt::Display for ConditionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionSlot::Entry => "entry",
            ConditionSlot::Exit => "exit",
            ConditionSlot::Safety => "safety",
            ConditionSlot::BullishEntry => "bullish entry",
            ConditionSlot::BearishEntry => "bearish entry",
            ConditionSlot::BullishExit => "bullish exit",
            ConditionSlot::BearishExit => "bearish exit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{slot} conditions are not used in {mode:?} mode")]
    InactiveSlot {
        slot: ConditionSlot,
        mode: ConditionMode,
    },

    #[error("{slot} conditions have no entry at index {index} (len {len})")]
    IndexOutOfRange {
        slot: ConditionSlot,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),
}

/// Everything a user configures before submitting a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub name: String,
    pub assets: AssetSelection,
    pub data_source: DataSource,
    pub max_concurrent_positions: u32,
    pub initial_capital: f64,
    /// Percent charged per trade
    pub fee_rate: f64,
    pub date_range: DateRange,
    pub take_profit: TakeProfit,
    pub stop_loss: StopLoss,
    pub safety_orders: SafetyOrders,
    pub reinvest_profit: bool,
    pub min_daily_volume: f64,
    /// Minutes
    pub cooldown_between_deals: u32,
    /// Minutes, 0 disables
    pub close_deal_after_timeout: u32,
    pub safety_conditions: Vec<Condition>,
    signals: ConditionSet,
}

impl StrategyConfig {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            name: String::new(),
            assets: AssetSelection::default(),
            data_source: DataSource::Spot,
            max_concurrent_positions: 1,
            initial_capital: 1000.0,
            fee_rate: 0.1,
            date_range: DateRange::trailing(today),
            take_profit: TakeProfit::default(),
            stop_loss: StopLoss::default(),
            safety_orders: SafetyOrders::default(),
            reinvest_profit: false,
            min_daily_volume: 0.0,
            cooldown_between_deals: 0,
            close_deal_after_timeout: 0,
            safety_conditions: Vec::new(),
            signals: ConditionSet::default(),
        }
    }

    /// Capital allotted to each position; undefined while the position count is zero
    pub fn base_order_size(&self) -> Option<f64> {
        if self.max_concurrent_positions == 0 {
            return None;
        }
        Some(self.initial_capital / f64::from(self.max_concurrent_positions))
    }

    pub fn signals(&self) -> &ConditionSet {
        &self.signals
    }

    pub fn mode(&self) -> ConditionMode {
        self.signals.mode()
    }

    /// Switch between flat and market-state lists. The previous lists are
    /// dropped so nothing from the inactive mode can leak into a submission.
    pub fn set_mode(&mut self, mode: ConditionMode) {
        if self.mode() != mode {
            self.signals = ConditionSet::empty(mode);
        }
    }

    pub fn set_signals(&mut self, signals: ConditionSet) {
        self.signals = signals;
    }

    pub fn conditions(&self, slot: ConditionSlot) -> Result<&[Condition], ConfigError> {
        let mode = self.mode();
        let list = match (slot, &self.signals) {
            (ConditionSlot::Safety, _) => &self.safety_conditions,
            (ConditionSlot::Entry, ConditionSet::Flat { entry, .. }) => entry,
            (ConditionSlot::Exit, ConditionSet::Flat { exit, .. }) => exit,
            (ConditionSlot::BullishEntry, ConditionSet::MarketState { bullish_entry, .. }) => {
                bullish_entry
            }
            (ConditionSlot::BearishEntry, ConditionSet::MarketState { bearish_entry, .. }) => {
                bearish_entry
            }
            (ConditionSlot::BullishExit, ConditionSet::MarketState { bullish_exit, .. }) => {
                bullish_exit
            }
            (ConditionSlot::BearishExit, ConditionSet::MarketState { bearish_exit, .. }) => {
                bearish_exit
            }
            _ => return Err(ConfigError::InactiveSlot { slot, mode }),
        };
        Ok(list.as_slice())
    }

    pub fn conditions_mut(&mut self, slot: ConditionSlot) -> Result<&mut Vec<Condition>, ConfigError> {
        let mode = self.mode();
        let list = match (slot, &mut self.signals) {
            (ConditionSlot::Safety, _) => &mut self.safety_conditions,
            (ConditionSlot::Entry, ConditionSet::Flat { entry, .. }) => entry,
            (ConditionSlot::Exit, ConditionSet::Flat { exit, .. }) => exit,
            (ConditionSlot::BullishEntry, ConditionSet::MarketState { bullish_entry, .. }) => {
                bullish_entry
            }
            (ConditionSlot::BearishEntry, ConditionSet::MarketState { bearish_entry, .. }) => {
                bearish_entry
            }
            (ConditionSlot::BullishExit, ConditionSet::MarketState { bullish_exit, .. }) => {
                bullish_exit
            }
            (ConditionSlot::BearishExit, ConditionSet::MarketState { bearish_exit, .. }) => {
                bearish_exit
            }
            _ => return Err(ConfigError::InactiveSlot { slot, mode }),
        };
        Ok(list)
    }

    /// Append a condition of `kind` initialised with defaults; returns its index
    pub fn add_condition(
        &mut self,
        slot: ConditionSlot,
        kind: IndicatorKind,
    ) -> Result<usize, ConfigError> {
        let list = self.conditions_mut(slot)?;
        list.push(Condition::new(kind));
        Ok(list.len() - 1)
    }

    pub fn condition_mut(
        &mut self,
        slot: ConditionSlot,
        index: usize,
    ) -> Result<&mut Condition, ConfigError> {
        let list = self.conditions_mut(slot)?;
        let len = list.len();
        list.get_mut(index)
            .ok_or(ConfigError::IndexOutOfRange { slot, index, len })
    }

    pub fn remove_condition(
        &mut self,
        slot: ConditionSlot,
        index: usize,
    ) -> Result<Condition, ConfigError> {
        let list = self.conditions_mut(slot)?;
        if index >= list.len() {
            return Err(ConfigError::IndexOutOfRange {
                slot,
                index,
                len: list.len(),
            });
        }
        Ok(list.remove(index))
    }

    /// Every condition that would be submitted in the current mode
    pub fn active_conditions(&self) -> Vec<(ConditionSlot, &Condition)> {
        ConditionSlot::ALL
            .iter()
            .filter_map(|slot| self.conditions(*slot).ok().map(|list| (*slot, list)))
            .flat_map(|(slot, list)| list.iter().map(move |c| (slot, c)))
            .collect()
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::new(Utc::now().date_naive())
    }
}
