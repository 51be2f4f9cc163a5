//! Configuration structures for the sonar pipeline.

use crate::error::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source column names.
    pub columns: ColumnConfig,
    /// Date parsing and rendering formats.
    pub dates: DateConfig,
    /// Block-trade volume thresholds per pair.
    pub thresholds: ThresholdTable,
    /// Pipeline behaviour switches.
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Parse a configuration from JSON, falling back to defaults for missing sections.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.columns.validate()?;
        self.dates.validate()?;
        self.thresholds.validate()
    }
}

/// Names of the source columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub pair: String,
    pub order: String,
    pub price: String,
    pub volume: String,
    pub expiry: String,
    pub trade_date: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            pair: "Pair".to_string(),
            order: "Order".to_string(),
            price: "Price".to_string(),
            volume: "Volume".to_string(),
            expiry: "Expiry".to_string(),
            trade_date: "Trade Date".to_string(),
        }
    }
}

impl ColumnConfig {
    fn validate(&self) -> Result<()> {
        let names = [
            ("pair", &self.pair),
            ("order", &self.order),
            ("price", &self.price),
            ("volume", &self.volume),
            ("expiry", &self.expiry),
            ("trade_date", &self.trade_date),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(Error::config(format!("column name for '{field}' is empty")));
            }
        }
        Ok(())
    }
}

/// Date formats (chrono strftime syntax).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Format of `Expiry` and `Trade Date` cells in the source sheets.
    pub input_format: String,
    /// Format used for human-facing display rows.
    pub display_format: String,
    /// Format used in the JSON export.
    pub export_format: String,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            input_format: "%d/%m/%Y".to_string(),
            display_format: "%d/%m/%Y".to_string(),
            export_format: "%Y-%m-%d".to_string(),
        }
    }
}

impl DateConfig {
    fn validate(&self) -> Result<()> {
        for fmt in [&self.input_format, &self.display_format, &self.export_format] {
            if fmt.is_empty() || StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                return Err(Error::config(format!("invalid date format '{fmt}'")));
            }
        }
        Ok(())
    }
}

/// Pipeline behaviour switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Treat an empty combined input as an error instead of an empty result.
    pub require_data: bool,
    /// Only derive price levels from groups flagged as block trades.
    pub levels_block_trades_only: bool,
}

/// Maximum non-block volume per currency pair.
///
/// A volume strictly above the threshold is a block trade. Pairs without an
/// entry are never flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable {
    thresholds: BTreeMap<String, u64>,
}

impl ThresholdTable {
    /// Create an empty table (nothing is ever a block trade).
    pub fn empty() -> Self {
        Self {
            thresholds: BTreeMap::new(),
        }
    }

    /// Build a table from `(pair, threshold)` entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            thresholds: entries.into_iter().map(|(p, t)| (p.into(), t)).collect(),
        }
    }

    /// Add or replace a pair threshold.
    pub fn insert(&mut self, pair: impl Into<String>, threshold: u64) {
        self.thresholds.insert(pair.into(), threshold);
    }

    /// Threshold for a pair, if configured.
    pub fn threshold(&self, pair: &str) -> Option<u64> {
        self.thresholds.get(pair).copied()
    }

    /// Number of configured pairs.
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    /// Whether no pair is configured.
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Iterate `(pair, threshold)` in pair order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.thresholds.iter().map(|(p, t)| (p.as_str(), *t))
    }

    fn validate(&self) -> Result<()> {
        for pair in self.thresholds.keys() {
            if pair.is_empty() || pair.trim() != pair || pair.to_uppercase() != *pair {
                return Err(Error::config(format!(
                    "threshold pair code '{pair}' must be non-empty upper case"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::from_entries([
            ("EURUSD", 145_000_000),
            ("AUDUSD", 50_000_000),
            ("GBPUSD", 110_000_000),
            ("USDCAD", 100_000_000),
            ("NZDUSD", 30_000_000),
            ("USDCHF", 100_000_000),
            ("USDSGD", 100_000_000),
            ("USDHKD", 100_000_000),
            ("AUDJPY", 50_000_000),
            ("CADJPY", 75_000_000),
            ("CHFJPY", 120_000_000),
            ("EURJPY", 145_000_000),
            ("GBPJPY", 110_000_000),
            ("NZDJPY", 30_000_000),
            ("AUDCAD", 50_000_000),
            ("AUDCHF", 50_000_000),
            ("AUDNZD", 50_000_000),
            ("CADCHF", 75_000_000),
            ("EURAUD", 145_000_000),
            ("EURCAD", 145_000_000),
            ("EURCHF", 145_000_000),
            ("EURGBP", 145_000_000),
            ("EURNZD", 145_000_000),
            ("GBPAUD", 110_000_000),
            ("GBPCHF", 110_000_000),
            ("GBPNZD", 110_000_000),
            ("NZDCAD", 30_000_000),
            ("NZDCHF", 30_000_000),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.columns.trade_date, "Trade Date");
        assert_eq!(config.dates.input_format, "%d/%m/%Y");
        assert_eq!(config.thresholds.len(), 28);
        assert_eq!(config.thresholds.threshold("EURUSD"), Some(145_000_000));
        assert_eq!(config.thresholds.threshold("NZDCHF"), Some(30_000_000));
        assert_eq!(config.thresholds.threshold("XAUUSD"), None);
        assert!(!config.pipeline.require_data);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json_str(
            r#"{"thresholds": {"EURUSD": 10}, "pipeline": {"require_data": true}}"#,
        )
        .unwrap();
        assert_eq!(config.thresholds.len(), 1);
        assert_eq!(config.thresholds.threshold("EURUSD"), Some(10));
        assert!(config.pipeline.require_data);
        assert_eq!(config.columns.pair, "Pair");
        assert_eq!(config.dates.export_format, "%Y-%m-%d");
    }

    #[test]
    fn test_rejects_lowercase_pair() {
        let err = Config::from_json_str(r#"{"thresholds": {"eurusd": 10}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_empty_column() {
        let err = Config::from_json_str(r#"{"columns": {"price": " "}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_bad_date_format() {
        let err = Config::from_json_str(r#"{"dates": {"input_format": "%Q"}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = Config::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
