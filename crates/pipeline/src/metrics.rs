//! Per-run metrics.

use serde::Serialize;
use sonar_features::BlockTradeStats;
use sonar_ingestion::NormalizationStats;

/// Counts describing one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Raw rows handed to the run.
    pub rows_in: u64,
    /// Rows that became trade records.
    pub accepted: u64,
    /// Rows dropped for an expiry before the run date.
    pub expired: u64,
    /// Rows dropped as malformed.
    pub malformed: u64,
    /// Consolidated groups produced.
    pub groups: u64,
    /// Groups flagged as block trades.
    pub block_trades: u64,
}

impl RunMetrics {
    /// Combine component statistics.
    pub fn from_stats(normalization: &NormalizationStats, classification: &BlockTradeStats) -> Self {
        Self {
            rows_in: normalization.rows_seen,
            accepted: normalization.accepted,
            expired: normalization.expired,
            malformed: normalization.total_malformed(),
            groups: classification.total_groups,
            block_trades: classification.block_groups,
        }
    }

    /// Fraction of input rows that survived normalization.
    pub fn acceptance_rate(&self) -> f64 {
        if self.rows_in > 0 {
            self.accepted as f64 / self.rows_in as f64
        } else {
            0.0
        }
    }

    /// Average rows merged into each group.
    pub fn rows_per_group(&self) -> f64 {
        if self.groups > 0 {
            self.accepted as f64 / self.groups as f64
        } else {
            0.0
        }
    }
}
