//! Block-trade classification.
//!
//! Flags consolidated groups whose volume exceeds the per-pair threshold.

use serde::Serialize;
use sonar_core::{ClassifiedGroup, ConsolidatedGroup, ThresholdTable};
use tracing::debug;

/// Statistics about block-trade classification.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockTradeStats {
    /// Groups classified.
    pub total_groups: u64,
    /// Groups flagged as block trades.
    pub block_groups: u64,
    /// Groups whose pair has no threshold.
    pub unthresholded_groups: u64,
    /// Total volume of flagged groups.
    pub block_volume: f64,
}

impl BlockTradeStats {
    /// Fraction of groups flagged.
    pub fn block_frac(&self) -> f64 {
        if self.total_groups > 0 {
            self.block_groups as f64 / self.total_groups as f64
        } else {
            0.0
        }
    }

    /// Reset statistics.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Classifier holding the threshold table for a run.
pub struct BlockTradeClassifier {
    thresholds: ThresholdTable,
    stats: BlockTradeStats,
}

impl BlockTradeClassifier {
    /// Create a classifier over the given thresholds.
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self {
            thresholds,
            stats: BlockTradeStats::default(),
        }
    }

    /// Whether `volume` is a block trade for `pair`.
    ///
    /// Strictly greater than the threshold; pairs without a threshold are
    /// never block trades.
    pub fn is_block_trade(&self, pair: &str, volume: f64) -> bool {
        match self.thresholds.threshold(pair) {
            Some(threshold) => volume > threshold as f64,
            None => false,
        }
    }

    /// Classify a single group.
    pub fn classify(&mut self, group: ConsolidatedGroup) -> ClassifiedGroup {
        let is_block_trade = self.is_block_trade(&group.pair, group.volume);

        self.stats.total_groups += 1;
        if self.thresholds.threshold(&group.pair).is_none() {
            self.stats.unthresholded_groups += 1;
        }
        if is_block_trade {
            self.stats.block_groups += 1;
            self.stats.block_volume += group.volume;
        }

        ClassifiedGroup {
            group,
            is_block_trade,
        }
    }

    /// Classify a batch of groups.
    pub fn classify_batch(&mut self, groups: Vec<ConsolidatedGroup>) -> Vec<ClassifiedGroup> {
        let classified: Vec<ClassifiedGroup> =
            groups.into_iter().map(|g| self.classify(g)).collect();

        debug!(
            groups = classified.len(),
            block_trades = classified.iter().filter(|c| c.is_block_trade).count(),
            "Classified groups"
        );

        classified
    }

    /// The threshold table in use.
    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Get classification statistics.
    pub fn stats(&self) -> &BlockTradeStats {
        &self.stats
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}
