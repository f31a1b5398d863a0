//! Indicator kinds, timeframes, comparators and the typed parameter set of each kind

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerated values that travel as fixed text labels in condition subfields.
pub trait Choice: Sized + Copy + PartialEq + 'static {
    const VARIANTS: &'static [Self];

    fn label(&self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.label() == label)
    }
}

/// Indicator kinds a condition can be built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndicatorKind {
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MA")]
    MovingAverageCrossover,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "BollingerBands%B")]
    BollingerBandsPercentB,
    #[serde(rename = "Stochastic")]
    Stochastic,
    #[serde(rename = "ParabolicSAR")]
    ParabolicSar,
    #[serde(rename = "ExternalSignal")]
    ExternalSignal,
    #[serde(rename = "HeikinAshi")]
    SmoothedCandle,
}

const ALL_COMPARATORS: &[Comparator] = &[
    Comparator::LessThan,
    Comparator::GreaterThan,
    Comparator::CrossingUp,
    Comparator::CrossingDown,
];

const CROSS_FIRST_COMPARATORS: &[Comparator] = &[
    Comparator::CrossingUp,
    Comparator::CrossingDown,
    Comparator::GreaterThan,
    Comparator::LessThan,
];

const CROSS_ONLY_COMPARATORS: &[Comparator] = &[Comparator::CrossingUp, Comparator::CrossingDown];

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 8] = [
        IndicatorKind::Rsi,
        IndicatorKind::MovingAverageCrossover,
        IndicatorKind::Macd,
        IndicatorKind::BollingerBandsPercentB,
        IndicatorKind::Stochastic,
        IndicatorKind::ParabolicSar,
        IndicatorKind::ExternalSignal,
        IndicatorKind::SmoothedCandle,
    ];

    /// Wire name used in the `indicator` field
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::MovingAverageCrossover => "MA",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::BollingerBandsPercentB => "BollingerBands%B",
            IndicatorKind::Stochastic => "Stochastic",
            IndicatorKind::ParabolicSar => "ParabolicSAR",
            IndicatorKind::ExternalSignal => "ExternalSignal",
            IndicatorKind::SmoothedCandle => "HeikinAshi",
        }
    }

    /// Comparators this kind accepts; the first one is the default
    pub fn allowed_comparators(&self) -> &'static [Comparator] {
        match self {
            IndicatorKind::Rsi
            | IndicatorKind::BollingerBandsPercentB
            | IndicatorKind::Stochastic => ALL_COMPARATORS,
            IndicatorKind::MovingAverageCrossover => CROSS_FIRST_COMPARATORS,
            IndicatorKind::Macd
            | IndicatorKind::ParabolicSar
            | IndicatorKind::ExternalSignal
            | IndicatorKind::SmoothedCandle => CROSS_ONLY_COMPARATORS,
        }
    }

    pub fn default_comparator(&self) -> Comparator {
        self.allowed_comparators()[0]
    }

    pub fn allows(&self, comparator: Comparator) -> bool {
        self.allowed_comparators().contains(&comparator)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candle timeframe a condition is evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[default]
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Choice for Timeframe {
    const VARIANTS: &'static [Self] = &[
        Timeframe::OneMinute,
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::ThirtyMinutes,
        Timeframe::OneHour,
        Timeframe::TwoHours,
        Timeframe::FourHours,
        Timeframe::OneDay,
    ];

    fn label(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1m",
            Timeframe::FiveMinutes => "5m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::ThirtyMinutes => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::TwoHours => "2h",
            Timeframe::FourHours => "4h",
            Timeframe::OneDay => "1d",
        }
    }
}

/// How the indicator value is compared against its trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "Less Than")]
    LessThan,
    #[serde(rename = "Greater Than")]
    GreaterThan,
    #[serde(rename = "Crossing Up")]
    CrossingUp,
    #[serde(rename = "Crossing Down")]
    CrossingDown,
}

impl Choice for Comparator {
    const VARIANTS: &'static [Self] = ALL_COMPARATORS;

    fn label(&self) -> &'static str {
        match self {
            Comparator::LessThan => "Less Than",
            Comparator::GreaterThan => "Greater Than",
            Comparator::CrossingUp => "Crossing Up",
            Comparator::CrossingDown => "Crossing Down",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaType {
    Sma,
    #[default]
    Ema,
}

impl Choice for MaType {
    const VARIANTS: &'static [Self] = &[MaType::Sma, MaType::Ema];

    fn label(&self) -> &'static str {
        match self {
            MaType::Sma => "SMA",
            MaType::Ema => "EMA",
        }
    }
}

/// Line the MACD crosses to trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacdTrigger {
    #[default]
    SignalLine,
    ZeroLine,
}

impl Choice for MacdTrigger {
    const VARIANTS: &'static [Self] = &[MacdTrigger::SignalLine, MacdTrigger::ZeroLine];

    fn label(&self) -> &'static str {
        match self {
            MacdTrigger::SignalLine => "Signal Line",
            MacdTrigger::ZeroLine => "Zero Line",
        }
    }
}

/// Rating published by an external signal provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalRating {
    StrongBuy,
    #[default]
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Choice for SignalRating {
    const VARIANTS: &'static [Self] = &[
        SignalRating::StrongBuy,
        SignalRating::Buy,
        SignalRating::Neutral,
        SignalRating::Sell,
        SignalRating::StrongSell,
    ];

    fn label(&self) -> &'static str {
        match self {
            SignalRating::StrongBuy => "Strong Buy",
            SignalRating::Buy => "Buy",
            SignalRating::Neutral => "Neutral",
            SignalRating::Sell => "Sell",
            SignalRating::StrongSell => "Strong Sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiParams {
    pub length: u32,
    pub value: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            length: 14,
            value: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingAverageParams {
    pub ma_type: MaType,
    pub fast: u32,
    pub slow: u32,
}

impl Default for MovingAverageParams {
    fn default() -> Self {
        Self {
            ma_type: MaType::Ema,
            fast: 50,
            slow: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdParams {
    pub fast_length: u32,
    pub slow_length: u32,
    pub signal_smoothing: u32,
    pub trigger: MacdTrigger,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_length: 12,
            slow_length: 26,
            signal_smoothing: 9,
            trigger: MacdTrigger::SignalLine,
        }
    }
}

/// Bollinger %B, `value` expressed in percent of the band width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerParams {
    pub length: u32,
    pub deviation: f64,
    pub value: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            length: 20,
            deviation: 2.0,
            value: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticParams {
    pub k_length: u32,
    pub k_smoothing: u32,
    pub d_smoothing: u32,
    pub value: f64,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_length: 14,
            k_smoothing: 3,
            d_smoothing: 3,
            value: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolicSarParams {
    pub start: f64,
    pub increment: f64,
    pub maximum: f64,
}

impl Default for ParabolicSarParams {
    fn default() -> Self {
        Self {
            start: 0.02,
            increment: 0.02,
            maximum: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExternalSignalParams {
    pub signal: SignalRating,
    pub timeframe: Timeframe,
}

/// Heikin-Ashi candles: number of consecutive candles of the new color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedCandleParams {
    pub consecutive_candles: u32,
}

impl Default for SmoothedCandleParams {
    fn default() -> Self {
        Self {
            consecutive_candles: 1,
        }
    }
}

/// Parameters of one condition; the variant fixes the indicator kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorParams {
    Rsi(RsiParams),
    MovingAverageCrossover(MovingAverageParams),
    Macd(MacdParams),
    BollingerBandsPercentB(BollingerParams),
    Stochastic(StochasticParams),
    ParabolicSar(ParabolicSarParams),
    ExternalSignal(ExternalSignalParams),
    SmoothedCandle(SmoothedCandleParams),
}

impl IndicatorParams {
    /// Fresh parameter set with every parameter at its default
    pub fn defaults(kind: IndicatorKind) -> Self {
        match kind {
            IndicatorKind::Rsi => IndicatorParams::Rsi(RsiParams::default()),
            IndicatorKind::MovingAverageCrossover => {
                IndicatorParams::MovingAverageCrossover(MovingAverageParams::default())
            }
            IndicatorKind::Macd => IndicatorParams::Macd(MacdParams::default()),
            IndicatorKind::BollingerBandsPercentB => {
                IndicatorParams::BollingerBandsPercentB(BollingerParams::default())
            }
            IndicatorKind::Stochastic => IndicatorParams::Stochastic(StochasticParams::default()),
            IndicatorKind::ParabolicSar => {
                IndicatorParams::ParabolicSar(ParabolicSarParams::default())
            }
            IndicatorKind::ExternalSignal => {
                IndicatorParams::ExternalSignal(ExternalSignalParams::default())
            }
            IndicatorKind::SmoothedCandle => {
                IndicatorParams::SmoothedCandle(SmoothedCandleParams::default())
            }
        }
    }

    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorParams::Rsi(_) => IndicatorKind::Rsi,
            IndicatorParams::MovingAverageCrossover(_) => IndicatorKind::MovingAverageCrossover,
            IndicatorParams::Macd(_) => IndicatorKind::Macd,
            IndicatorParams::BollingerBandsPercentB(_) => IndicatorKind::BollingerBandsPercentB,
            IndicatorParams::Stochastic(_) => IndicatorKind::Stochastic,
            IndicatorParams::ParabolicSar(_) => IndicatorKind::ParabolicSar,
            IndicatorParams::ExternalSignal(_) => IndicatorKind::ExternalSignal,
            IndicatorParams::SmoothedCandle(_) => IndicatorKind::SmoothedCandle,
        }
    }
}
