//! End-to-end runs of the sonar pipeline.
//!
//! This crate provides:
//! - The display and export runners (normalize, consolidate, classify)
//! - Presentation formatting of consolidated groups
//! - JSON export records
//! - Per-run metrics

pub mod formatter;
pub mod export;
pub mod runner;
pub mod metrics;

pub use formatter::{DisplayRow, PresentationFormatter};
pub use export::ExportRecord;
pub use runner::{DisplayReport, ExportReport, PipelineRunner};
pub use metrics::RunMetrics;
