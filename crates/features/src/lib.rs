//! Derived features for the sonar pipeline.
//!
//! This crate handles:
//! - Block-trade classification against per-pair volume thresholds
//! - Per-pair price level extraction for overlay scripts

pub mod block_trade;
pub mod price_levels;

pub use block_trade::{BlockTradeClassifier, BlockTradeStats};
pub use price_levels::{LevelEntry, PriceLevelExtractor, PriceLevels};
