//! Pipeline runner.
//!
//! Runs raw records through normalization, consolidation and
//! classification, then shapes the result for the dashboard table or the
//! block-trade export. A runner only holds configuration, so one instance
//! can serve any number of runs.

use crate::export::{export_json, ExportRecord};
use crate::formatter::{DisplayRow, PresentationFormatter};
use crate::metrics::RunMetrics;
use chrono::NaiveDate;
use sonar_core::{ClassifiedGroup, Config, Error, PipelineMode, RawRecord, Result};
use sonar_features::{BlockTradeClassifier, LevelEntry, PriceLevelExtractor, PriceLevels};
use sonar_ingestion::{Consolidator, RecordNormalizer};
use tracing::info;

/// Output of a display run.
#[derive(Debug, Clone)]
pub struct DisplayReport {
    /// Formatted table rows, in group order.
    pub rows: Vec<DisplayRow>,
    /// The classified groups behind the rows.
    pub groups: Vec<ClassifiedGroup>,
    pub metrics: RunMetrics,
}

/// Output of an export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub records: Vec<ExportRecord>,
    pub groups: Vec<ClassifiedGroup>,
    pub metrics: RunMetrics,
}

impl ExportReport {
    /// Render the export records as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        export_json(&self.records)
    }
}

/// Runs the pipeline with a fixed configuration.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    config: Config,
    formatter: PresentationFormatter,
}

impl PipelineRunner {
    /// Create a runner, validating the configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let formatter = PresentationFormatter::new(&config.dates);
        Ok(Self { config, formatter })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The local calendar date, for callers that run against the wall clock.
    pub fn today_local() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    /// Normalize, consolidate and classify.
    pub fn classify(
        &self,
        records: &[RawRecord],
        mode: PipelineMode,
        today: NaiveDate,
    ) -> Result<(Vec<ClassifiedGroup>, RunMetrics)> {
        if records.is_empty() && self.config.pipeline.require_data {
            return Err(Error::no_data("no records in combined input"));
        }

        let mut normalizer = RecordNormalizer::new(&self.config, mode, today);
        let trades = normalizer.normalize(records)?;

        let groups = Consolidator::new(mode).consolidate(&trades);

        let mut classifier = BlockTradeClassifier::new(self.config.thresholds.clone());
        let classified = classifier.classify_batch(groups);

        let metrics = RunMetrics::from_stats(normalizer.stats(), classifier.stats());
        Ok((classified, metrics))
    }

    /// Run for the dashboard table.
    pub fn run_display(&self, records: &[RawRecord], today: NaiveDate) -> Result<DisplayReport> {
        info!(rows = records.len(), %today, "Starting display run");

        let (groups, metrics) = self.classify(records, PipelineMode::Display, today)?;
        let rows = self.formatter.display_rows(&groups);

        info!(
            accepted = metrics.accepted,
            expired = metrics.expired,
            malformed = metrics.malformed,
            groups = metrics.groups,
            "Display run complete"
        );

        Ok(DisplayReport {
            rows,
            groups,
            metrics,
        })
    }

    /// Run for the block-trade export.
    pub fn run_export(&self, records: &[RawRecord], today: NaiveDate) -> Result<ExportReport> {
        info!(rows = records.len(), %today, "Starting export run");

        let (groups, metrics) = self.classify(records, PipelineMode::Export, today)?;
        let export_format = &self.config.dates.export_format;
        let records = groups
            .iter()
            .map(|g| ExportRecord::from_classified(g, export_format))
            .collect::<Result<Vec<_>>>()?;

        info!(
            groups = metrics.groups,
            block_trades = metrics.block_trades,
            "Export run complete"
        );

        Ok(ExportReport {
            records,
            groups,
            metrics,
        })
    }

    /// Price levels from classified groups.
    pub fn price_levels(&self, groups: &[ClassifiedGroup], today: NaiveDate) -> PriceLevels {
        PriceLevelExtractor::new(today)
            .from_groups(groups, self.config.pipeline.levels_block_trades_only)
    }

    /// Price levels from flat entries, such as a previously written export.
    ///
    /// Expiries are accepted in the sheet format as well as the export format.
    pub fn price_levels_from_entries(&self, entries: &[LevelEntry], today: NaiveDate) -> PriceLevels {
        let dates = &self.config.dates;
        let mut formats = vec![dates.input_format.clone()];
        if dates.export_format != dates.input_format {
            formats.push(dates.export_format.clone());
        }
        PriceLevelExtractor::with_formats(today, formats).from_entries(entries)
    }

    /// Whether a volume would be a block trade for a pair.
    pub fn is_block_trade(&self, pair: &str, volume: f64) -> bool {
        BlockTradeClassifier::new(self.config.thresholds.clone()).is_block_trade(pair, volume)
    }
}
