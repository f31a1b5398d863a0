//! Strategy condition model and backtest queue client.

pub mod config;
pub mod core;
pub mod indicators;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod strategies;
