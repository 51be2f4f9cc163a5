//! Raw row normalization.
//!
//! Coerces heterogeneous sheet rows into [`TradeRecord`]s. Rows that cannot
//! be coerced, or whose expiry lies before the run date, are excluded with a
//! typed [`RowOutcome`] rather than an error.

use chrono::NaiveDate;
use serde::Serialize;
use sonar_core::{
    ColumnConfig, Config, Error, MalformedReason, OrderType, PipelineMode, RawRecord, RawValue,
    Result, RowOutcome, TradeRecord,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Statistics about a normalization pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationStats {
    /// Rows examined.
    pub rows_seen: u64,
    /// Rows turned into trade records.
    pub accepted: u64,
    /// Rows dropped because their expiry had passed.
    pub expired: u64,
    /// Rows dropped as malformed, by reason.
    pub malformed: HashMap<MalformedReason, u64>,
}

impl NormalizationStats {
    /// Rows dropped as malformed for one reason.
    pub fn malformed_for(&self, reason: MalformedReason) -> u64 {
        self.malformed.get(&reason).copied().unwrap_or(0)
    }

    /// Rows dropped as malformed for any reason.
    pub fn total_malformed(&self) -> u64 {
        self.malformed.values().sum()
    }

    /// Rows dropped for any reason.
    pub fn total_dropped(&self) -> u64 {
        self.expired + self.total_malformed()
    }

    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn record(&mut self, outcome: &RowOutcome) {
        self.rows_seen += 1;
        match outcome {
            RowOutcome::Accepted(_) => self.accepted += 1,
            RowOutcome::DroppedExpired { .. } => self.expired += 1,
            RowOutcome::DroppedMalformed(reason) => {
                *self.malformed.entry(*reason).or_insert(0) += 1;
            }
        }
    }
}

/// Normalizer for one pipeline run.
pub struct RecordNormalizer {
    /// Source column names.
    columns: ColumnConfig,
    /// strftime format of date cells.
    input_format: String,
    /// Display or export shape.
    mode: PipelineMode,
    /// Run date; expiries before it are dropped.
    today: NaiveDate,
    /// Normalization statistics.
    stats: NormalizationStats,
}

impl RecordNormalizer {
    /// Create a normalizer for a run on `today`.
    pub fn new(config: &Config, mode: PipelineMode, today: NaiveDate) -> Self {
        Self {
            columns: config.columns.clone(),
            input_format: config.dates.input_format.clone(),
            mode,
            today,
            stats: NormalizationStats::default(),
        }
    }

    /// Columns that must appear somewhere in the input.
    fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![
            self.columns.pair.as_str(),
            self.columns.order.as_str(),
            self.columns.price.as_str(),
            self.columns.volume.as_str(),
            self.columns.expiry.as_str(),
        ];
        if self.mode == PipelineMode::Export {
            columns.push(self.columns.trade_date.as_str());
        }
        columns
    }

    /// Fail if a required column is absent from every record.
    ///
    /// Sheets may differ in their columns, so presence in any one record is
    /// enough. An empty input passes.
    pub fn check_schema(&self, records: &[RawRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for column in self.required_columns() {
            if !records.iter().any(|r| r.contains_key(column)) {
                return Err(Error::missing_column(column));
            }
        }
        Ok(())
    }

    /// Normalize a single row.
    pub fn normalize_row(&mut self, record: &RawRecord) -> RowOutcome {
        let outcome = self.evaluate(record);
        if let RowOutcome::DroppedMalformed(reason) = &outcome {
            trace!(%reason, "Dropping malformed row");
        }
        self.stats.record(&outcome);
        outcome
    }

    fn evaluate(&self, record: &RawRecord) -> RowOutcome {
        let cell = |name: &str| record.get(name);

        let expiry = match parse_date(cell(self.columns.expiry.as_str()), &self.input_format) {
            Some(date) => date,
            None => return RowOutcome::DroppedMalformed(MalformedReason::InvalidExpiry),
        };
        if expiry < self.today {
            return RowOutcome::DroppedExpired { expiry };
        }

        let trade_date = match self.mode {
            PipelineMode::Display => None,
            PipelineMode::Export => {
                match parse_date(cell(self.columns.trade_date.as_str()), &self.input_format) {
                    Some(date) => Some(date),
                    None => {
                        return RowOutcome::DroppedMalformed(MalformedReason::InvalidTradeDate)
                    }
                }
            }
        };

        let Some(volume) = cell(self.columns.volume.as_str()).and_then(clean_volume) else {
            return RowOutcome::DroppedMalformed(MalformedReason::InvalidVolume);
        };
        let Some(price) = cell(self.columns.price.as_str()).and_then(RawValue::to_number) else {
            return RowOutcome::DroppedMalformed(MalformedReason::InvalidPrice);
        };
        let Some(pair) = cell(self.columns.pair.as_str()).and_then(RawValue::as_text) else {
            return RowOutcome::DroppedMalformed(MalformedReason::MissingPair);
        };
        let Some(order) = cell(self.columns.order.as_str())
            .and_then(RawValue::as_text)
            .and_then(|s| OrderType::parse(&s))
        else {
            return RowOutcome::DroppedMalformed(MalformedReason::MissingOrder);
        };

        RowOutcome::Accepted(TradeRecord {
            pair: pair.to_uppercase(),
            order,
            price,
            volume,
            expiry,
            trade_date,
        })
    }

    /// Normalize a full record set, keeping only accepted rows.
    ///
    /// Returns an error only when the input as a whole lacks a required column.
    pub fn normalize(&mut self, records: &[RawRecord]) -> Result<Vec<TradeRecord>> {
        self.check_schema(records)?;

        let accepted: Vec<TradeRecord> = records
            .iter()
            .filter_map(|record| self.normalize_row(record).accepted())
            .collect();

        debug!(
            mode = ?self.mode,
            rows = records.len(),
            accepted = accepted.len(),
            expired = self.stats.expired,
            malformed = self.stats.total_malformed(),
            "Normalized records"
        );

        Ok(accepted)
    }

    /// Get normalization statistics.
    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

/// Parse a date cell. Only text cells in the given format are accepted.
pub fn parse_date(value: Option<&RawValue>, format: &str) -> Option<NaiveDate> {
    match value? {
        RawValue::Text(s) => NaiveDate::parse_from_str(s.trim(), format).ok(),
        _ => None,
    }
}

/// Clean a volume cell: drop thousands separators and parse.
///
/// Negative or non-finite volumes are rejected.
pub fn clean_volume(value: &RawValue) -> Option<f64> {
    let volume = match value {
        RawValue::Integer(i) => *i as f64,
        RawValue::Float(f) => *f,
        RawValue::Text(s) => s.replace(',', "").trim().parse::<f64>().ok()?,
        RawValue::Bool(_) | RawValue::Empty => return None,
    };
    (volume.is_finite() && volume >= 0.0).then_some(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn make_row(cells: &[(&str, RawValue)]) -> RawRecord {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn valid_row() -> RawRecord {
        make_row(&[
            ("Pair", "EURUSD".into()),
            ("Order", "CALL".into()),
            ("Price", "1.10000".into()),
            ("Volume", "50,000,000".into()),
            ("Expiry", "11/03/2026".into()),
            ("Trade Date", "01/03/2026".into()),
        ])
    }

    fn with(mut row: RawRecord, column: &str, value: RawValue) -> RawRecord {
        row.insert(column.to_string(), value);
        row
    }

    fn normalizer(mode: PipelineMode) -> RecordNormalizer {
        RecordNormalizer::new(&Config::default(), mode, today())
    }

    #[test]
    fn test_accepts_valid_row() {
        let mut n = normalizer(PipelineMode::Display);
        let record = n.normalize_row(&valid_row()).accepted().unwrap();

        assert_eq!(record.pair, "EURUSD");
        assert_eq!(record.order, OrderType::Call);
        assert_relative_eq!(record.price, 1.1);
        assert_relative_eq!(record.volume, 50_000_000.0);
        assert_eq!(record.expiry, NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());
        assert_eq!(record.trade_date, None);
    }

    #[test]
    fn test_export_keeps_trade_date() {
        let mut n = normalizer(PipelineMode::Export);
        let record = n.normalize_row(&valid_row()).accepted().unwrap();
        assert_eq!(record.trade_date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn test_export_requires_trade_date() {
        let mut n = normalizer(PipelineMode::Export);
        let row = with(valid_row(), "Trade Date", "yesterday".into());
        assert_eq!(
            n.normalize_row(&row),
            RowOutcome::DroppedMalformed(MalformedReason::InvalidTradeDate)
        );

        // Display mode never looks at it.
        let mut d = normalizer(PipelineMode::Display);
        assert!(d.normalize_row(&row).is_accepted());
    }

    #[test]
    fn test_expiry_today_survives() {
        let mut n = normalizer(PipelineMode::Display);
        let row = with(valid_row(), "Expiry", "10/03/2026".into());
        assert!(n.normalize_row(&row).is_accepted());
    }

    #[test]
    fn test_expired_row_dropped_regardless_of_other_fields() {
        let mut n = normalizer(PipelineMode::Display);
        let row = make_row(&[
            ("Pair", RawValue::Empty),
            ("Price", "n/a".into()),
            ("Expiry", "09/03/2026".into()),
        ]);
        assert_eq!(
            n.normalize_row(&row),
            RowOutcome::DroppedExpired {
                expiry: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
            }
        );
    }

    #[test]
    fn test_unparsable_expiry() {
        let mut n = normalizer(PipelineMode::Display);
        for bad in ["2026-03-11", "31/02/2026", ""] {
            let row = with(valid_row(), "Expiry", bad.into());
            assert_eq!(
                n.normalize_row(&row),
                RowOutcome::DroppedMalformed(MalformedReason::InvalidExpiry)
            );
        }
        let numeric = with(valid_row(), "Expiry", RawValue::Integer(46092));
        assert!(!n.normalize_row(&numeric).is_accepted());
    }

    #[test]
    fn test_single_digit_day_month() {
        let mut n = normalizer(PipelineMode::Display);
        let row = with(valid_row(), "Expiry", " 1/4/2026 ".into());
        let record = n.normalize_row(&row).accepted().unwrap();
        assert_eq!(record.expiry, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }

    #[test]
    fn test_non_numeric_price_dropped() {
        let mut n = normalizer(PipelineMode::Display);
        let row = with(valid_row(), "Price", "n/a".into());
        assert_eq!(
            n.normalize_row(&row),
            RowOutcome::DroppedMalformed(MalformedReason::InvalidPrice)
        );
    }

    #[test]
    fn test_volume_cleanup() {
        assert_eq!(clean_volume(&"1,250,000".into()), Some(1_250_000.0));
        assert_eq!(clean_volume(&" 2,500.75 ".into()), Some(2_500.75));
        assert_eq!(clean_volume(&RawValue::Integer(42)), Some(42.0));
        assert_eq!(clean_volume(&RawValue::Float(1.5)), Some(1.5));
        assert_eq!(clean_volume(&"lots".into()), None);
        assert_eq!(clean_volume(&"".into()), None);
        assert_eq!(clean_volume(&"-5".into()), None);
        assert_eq!(clean_volume(&RawValue::Empty), None);
    }

    #[test]
    fn test_missing_pair_and_order() {
        let mut n = normalizer(PipelineMode::Display);
        let row = with(valid_row(), "Pair", "  ".into());
        assert_eq!(
            n.normalize_row(&row),
            RowOutcome::DroppedMalformed(MalformedReason::MissingPair)
        );

        let mut row = valid_row();
        row.remove("Order");
        assert_eq!(
            n.normalize_row(&row),
            RowOutcome::DroppedMalformed(MalformedReason::MissingOrder)
        );
    }

    #[test]
    fn test_identifiers_canonicalized() {
        let mut n = normalizer(PipelineMode::Display);
        let row = with(with(valid_row(), "Pair", " gbpusd".into()), "Order", "put ".into());
        let record = n.normalize_row(&row).accepted().unwrap();
        assert_eq!(record.pair, "GBPUSD");
        assert_eq!(record.order, OrderType::Put);

        let row = with(valid_row(), "Order", "Risk Reversal".into());
        let record = n.normalize_row(&row).accepted().unwrap();
        assert_eq!(record.order, OrderType::Other("RISK REVERSAL".to_string()));
    }

    #[test]
    fn test_schema_check() {
        let n = normalizer(PipelineMode::Export);
        let mut row = valid_row();
        row.remove("Trade Date");

        let err = n.check_schema(&[row.clone()]).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "Trade Date"));

        // Present in any one record is enough.
        assert!(n.check_schema(&[row, valid_row()]).is_ok());
        assert!(n.check_schema(&[]).is_ok());
    }

    #[test]
    fn test_normalize_batch_and_stats() {
        let mut n = normalizer(PipelineMode::Display);
        let rows = vec![
            valid_row(),
            with(valid_row(), "Expiry", "01/01/2026".into()),
            with(valid_row(), "Price", "n/a".into()),
            with(valid_row(), "Volume", "many".into()),
        ];

        let records = n.normalize(&rows).unwrap();
        assert_eq!(records.len(), 1);

        let stats = n.stats();
        assert_eq!(stats.rows_seen, 4);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.malformed_for(MalformedReason::InvalidPrice), 1);
        assert_eq!(stats.malformed_for(MalformedReason::InvalidVolume), 1);
        assert_eq!(stats.total_dropped(), 3);

        n.reset_stats();
        assert_eq!(n.stats().rows_seen, 0);
    }
}
