//! Core types and configuration for the sonar order pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Raw and normalized order records
//! - Consolidated and classified groups
//! - Configuration structures (columns, date formats, thresholds)
//! - Shared price rendering
//! - Common error types

pub mod config;
pub mod error;
pub mod format;
pub mod types;

pub use config::{ColumnConfig, Config, DateConfig, PipelineConfig, ThresholdTable};
pub use error::{Error, Result};
pub use types::*;
