//! Per-pair price levels.
//!
//! Collects the distinct prices at which live (non-expired) orders exist,
//! per currency pair, for overlay scripts.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use sonar_core::format::canonical_price;
use sonar_core::{ClassifiedGroup, Price, RawValue};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Expiry formats accepted on flat entries: sheet style and export style.
pub const DEFAULT_ENTRY_DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

/// A loose trade entry, as read back from an export file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelEntry {
    #[serde(rename = "Pair", default)]
    pub pair: Option<RawValue>,
    #[serde(rename = "Price", default)]
    pub price: Option<RawValue>,
    #[serde(rename = "Expiry", default)]
    pub expiry: Option<RawValue>,
}

/// Distinct price levels per pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceLevels {
    levels: BTreeMap<String, BTreeSet<Price>>,
}

impl PriceLevels {
    /// Add a price for a pair. The price is rounded to its canonical
    /// five-decimal value first.
    pub fn add(&mut self, pair: &str, price: f64) {
        if let Some(level) = canonical_price(price) {
            self.levels
                .entry(pair.to_string())
                .or_default()
                .insert(OrderedFloat(level));
        }
    }

    /// Pairs with at least one level, in ascending order.
    pub fn pairs(&self) -> impl Iterator<Item = &str> {
        self.levels.keys().map(String::as_str)
    }

    /// Levels for a pair, highest first.
    pub fn levels(&self, pair: &str) -> Vec<f64> {
        self.levels
            .get(pair)
            .map(|set| set.iter().rev().map(|p| p.0).collect())
            .unwrap_or_default()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Convert into pair -> descending levels.
    pub fn into_map(self) -> BTreeMap<String, Vec<f64>> {
        self.levels
            .into_iter()
            .map(|(pair, set)| (pair, set.into_iter().rev().map(|p| p.0).collect()))
            .collect()
    }
}

/// Extracts price levels for a run date.
pub struct PriceLevelExtractor {
    today: NaiveDate,
    entry_date_formats: Vec<String>,
}

impl PriceLevelExtractor {
    /// Create an extractor for a run on `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self::with_formats(today, DEFAULT_ENTRY_DATE_FORMATS)
    }

    /// Create an extractor accepting the given expiry formats on flat entries.
    pub fn with_formats<I, S>(today: NaiveDate, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            today,
            entry_date_formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    /// Levels from classified groups.
    ///
    /// With `block_trades_only`, groups not flagged as block trades are skipped.
    pub fn from_groups(&self, groups: &[ClassifiedGroup], block_trades_only: bool) -> PriceLevels {
        let mut levels = PriceLevels::default();
        for classified in groups {
            let group = &classified.group;
            if block_trades_only && !classified.is_block_trade {
                continue;
            }
            if group.expiry < self.today || group.pair.is_empty() {
                continue;
            }
            levels.add(&group.pair, group.price);
        }

        debug!(groups = groups.len(), pairs = levels.len(), "Extracted price levels");
        levels
    }

    /// Levels from flat entries.
    ///
    /// Entries missing a field, with an unparseable expiry or price, or
    /// already expired are skipped.
    pub fn from_entries(&self, entries: &[LevelEntry]) -> PriceLevels {
        let mut levels = PriceLevels::default();
        let mut skipped = 0usize;

        for entry in entries {
            match self.entry_level(entry) {
                Some((pair, price)) => levels.add(&pair, price),
                None => skipped += 1,
            }
        }

        debug!(
            entries = entries.len(),
            skipped,
            pairs = levels.len(),
            "Extracted price levels from entries"
        );
        levels
    }

    fn entry_level(&self, entry: &LevelEntry) -> Option<(String, f64)> {
        let pair = entry.pair.as_ref()?.as_text()?.to_uppercase();
        let price = entry.price.as_ref()?.to_number()?;
        let expiry = self.parse_expiry(&entry.expiry.as_ref()?.as_text()?)?;
        if expiry < self.today {
            return None;
        }
        Some((pair, price))
    }

    fn parse_expiry(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        self.entry_date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_core::{ConsolidatedGroup, OrderType};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 15).unwrap()
    }

    fn make_entry(pair: &str, price: RawValue, expiry: &str) -> LevelEntry {
        LevelEntry {
            pair: Some(pair.into()),
            price: Some(price),
            expiry: Some(expiry.into()),
        }
    }

    fn make_classified(pair: &str, price: f64, expiry: NaiveDate, is_block_trade: bool) -> ClassifiedGroup {
        ClassifiedGroup {
            group: ConsolidatedGroup {
                trade_date: None,
                pair: pair.to_string(),
                order: OrderType::Put,
                price,
                volume: 1.0,
                expiry,
                row_count: 1,
            },
            is_block_trade,
        }
    }

    #[test]
    fn test_dedup_beyond_five_decimals() {
        let extractor = PriceLevelExtractor::new(today());
        let levels = extractor.from_entries(&[
            make_entry("EURUSD", "1.234500".into(), "2026-05-20"),
            make_entry("EURUSD", RawValue::Float(1.2345), "20/05/2026"),
            make_entry("EURUSD", RawValue::Float(1.2345000004), "2026-05-20"),
        ]);
        assert_eq!(levels.levels("EURUSD"), vec![1.2345]);
    }

    #[test]
    fn test_levels_sorted_descending() {
        let extractor = PriceLevelExtractor::new(today());
        let levels = extractor.from_entries(&[
            make_entry("GBPUSD", RawValue::Float(1.25), "2026-06-01"),
            make_entry("GBPUSD", RawValue::Float(1.3), "2026-06-01"),
            make_entry("GBPUSD", RawValue::Float(1.2), "2026-06-01"),
            make_entry("AUDUSD", RawValue::Float(0.66), "2026-06-01"),
        ]);
        assert_eq!(levels.levels("GBPUSD"), vec![1.3, 1.25, 1.2]);
        assert_eq!(levels.pairs().collect::<Vec<_>>(), vec!["AUDUSD", "GBPUSD"]);
    }

    #[test]
    fn test_expired_and_incomplete_entries_skipped() {
        let extractor = PriceLevelExtractor::new(today());
        let levels = extractor.from_entries(&[
            make_entry("EURUSD", RawValue::Float(1.1), "2026-05-14"),
            make_entry("EURUSD", RawValue::Float(1.2), "not a date"),
            make_entry("EURUSD", "n/a".into(), "2026-05-20"),
            make_entry("", RawValue::Float(1.3), "2026-05-20"),
            LevelEntry {
                pair: Some("EURUSD".into()),
                price: None,
                expiry: Some("2026-05-20".into()),
            },
            make_entry("EURUSD", RawValue::Float(1.4), "15/05/2026"),
        ]);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels.levels("EURUSD"), vec![1.4]);
    }

    #[test]
    fn test_entries_from_export_json() {
        let entries: Vec<LevelEntry> = serde_json::from_str(
            r#"[
                {"Trade Date": "2026-05-01", "Pair": "USDJPY", "Order": "CALL",
                 "Price": 150.5, "Volume": 2.0e8, "Expiry": "2026-05-30", "IsBlockTrade": false},
                {"Pair": "USDJPY", "Price": 151, "Expiry": "2026-05-30"}
            ]"#,
        )
        .unwrap();
        let levels = PriceLevelExtractor::new(today()).from_entries(&entries);
        assert_eq!(levels.into_map()["USDJPY"], vec![151.0, 150.5]);
    }

    #[test]
    fn test_non_text_cells_skip_only_their_entry() {
        let entries: Vec<LevelEntry> = serde_json::from_str(
            r#"[
                {"Pair": "EURUSD", "Price": 1.1, "Expiry": "2026-05-20"},
                {"Pair": "EURUSD", "Price": 1.2, "Expiry": 46092},
                {"Pair": true, "Price": 1.3, "Expiry": "2026-05-20"},
                {"Pair": "EURUSD", "Price": 1.4, "Expiry": null}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 4);

        let levels = PriceLevelExtractor::new(today()).from_entries(&entries);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels.levels("EURUSD"), vec![1.1]);
    }

    #[test]
    fn test_zero_price_is_a_level() {
        let levels = PriceLevelExtractor::new(today()).from_entries(&[
            make_entry("EURUSD", RawValue::Integer(0), "2026-05-20"),
            make_entry("EURUSD", "0".into(), "2026-05-20"),
            make_entry("EURUSD", RawValue::Float(1.1), "2026-05-20"),
        ]);
        assert_eq!(levels.levels("EURUSD"), vec![1.1, 0.0]);
    }

    #[test]
    fn test_from_groups() {
        let extractor = PriceLevelExtractor::new(today());
        let live = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
        let dead = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let groups = vec![
            make_classified("EURUSD", 1.1, live, true),
            make_classified("EURUSD", 1.15, live, false),
            make_classified("EURUSD", 1.2, dead, true),
        ];

        let all = extractor.from_groups(&groups, false);
        assert_eq!(all.levels("EURUSD"), vec![1.15, 1.1]);

        let blocks = extractor.from_groups(&groups, true);
        assert_eq!(blocks.levels("EURUSD"), vec![1.1]);
    }

    #[test]
    fn test_unknown_pair_has_no_levels() {
        let levels = PriceLevels::default();
        assert!(levels.levels("EURUSD").is_empty());
        assert!(levels.is_empty());
    }
}
