//! Record ingestion for the sonar pipeline.
//!
//! This crate handles:
//! - Raw row normalization (dates, volumes, prices, identifiers)
//! - Expired-quote filtering
//! - Consolidation of duplicate orders by key

pub mod normalizer;
pub mod consolidator;

pub use normalizer::{RecordNormalizer, NormalizationStats};
pub use consolidator::{Consolidator, VolumePolicy};
