//! Order consolidation.
//!
//! Merges trade records sharing a grouping key into one
//! [`ConsolidatedGroup`], summing volume and keeping the earliest expiry.

use chrono::NaiveDate;
use sonar_core::{ConsolidatedGroup, GroupKey, PipelineMode, TradeRecord};
use std::collections::BTreeMap;
use tracing::debug;

/// How member volumes are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumePolicy {
    /// Truncate each row to a whole number, then sum integers.
    TruncatePerRow,
    /// Sum the cleaned floating volumes as they are.
    SumRaw,
}

impl VolumePolicy {
    /// Policy used by each pipeline mode.
    pub fn for_mode(mode: PipelineMode) -> Self {
        match mode {
            PipelineMode::Display => VolumePolicy::TruncatePerRow,
            PipelineMode::Export => VolumePolicy::SumRaw,
        }
    }
}

/// A group that's currently being accumulated.
#[derive(Debug, Clone)]
struct GroupInProgress {
    whole_volume: u64,
    raw_volume: f64,
    expiry: NaiveDate,
    row_count: u32,
}

impl GroupInProgress {
    fn new(expiry: NaiveDate) -> Self {
        Self {
            whole_volume: 0,
            raw_volume: 0.0,
            expiry,
            row_count: 0,
        }
    }

    fn add_record(&mut self, record: &TradeRecord) {
        self.whole_volume = self.whole_volume.saturating_add(record.whole_volume());
        self.raw_volume += record.volume;
        self.expiry = self.expiry.min(record.expiry);
        self.row_count += 1;
    }

    fn into_group(self, key: GroupKey, policy: VolumePolicy) -> ConsolidatedGroup {
        let volume = match policy {
            VolumePolicy::TruncatePerRow => self.whole_volume as f64,
            VolumePolicy::SumRaw => self.raw_volume,
        };
        ConsolidatedGroup {
            trade_date: key.trade_date,
            pair: key.pair,
            order: key.order,
            price: key.price.into_inner(),
            volume,
            expiry: self.expiry,
            row_count: self.row_count,
        }
    }
}

/// Groups trade records by key.
pub struct Consolidator {
    mode: PipelineMode,
    policy: VolumePolicy,
}

impl Consolidator {
    /// Create a consolidator using the mode's own volume policy.
    pub fn new(mode: PipelineMode) -> Self {
        Self::with_policy(mode, VolumePolicy::for_mode(mode))
    }

    /// Create a consolidator with an explicit volume policy.
    pub fn with_policy(mode: PipelineMode, policy: VolumePolicy) -> Self {
        Self { mode, policy }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    pub fn policy(&self) -> VolumePolicy {
        self.policy
    }

    /// Consolidate records into one group per distinct key.
    ///
    /// Output comes back in ascending key order.
    pub fn consolidate(&self, records: &[TradeRecord]) -> Vec<ConsolidatedGroup> {
        let mut groups: BTreeMap<GroupKey, GroupInProgress> = BTreeMap::new();

        for record in records {
            groups
                .entry(record.key(self.mode))
                .or_insert_with(|| GroupInProgress::new(record.expiry))
                .add_record(record);
        }

        let result: Vec<ConsolidatedGroup> = groups
            .into_iter()
            .map(|(key, group)| group.into_group(key, self.policy))
            .collect();

        debug!(
            mode = ?self.mode,
            rows = records.len(),
            groups = result.len(),
            "Consolidated records"
        );

        result
    }
}
