//! PyO3 bindings for the sonar order pipeline.
//!
//! Exposes the Rust pipeline to the Python dashboard and export scripts:
//! - Display rows for the order table
//! - Block-trade JSON export
//! - Per-pair price levels for overlay scripts
//! - Logging setup

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pyo3::exceptions::{PyLookupError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyList};
use tracing_subscriber::EnvFilter;

use sonar_core::{Config, Error as SonarError, RawRecord, RawValue};
use sonar_features::LevelEntry;
use sonar_pipeline::PipelineRunner;

// ============================================================================
// Conversions
// ============================================================================

fn to_py_err(err: SonarError) -> PyErr {
    if err.is_no_data() {
        PyLookupError::new_err(err.to_string())
    } else if err.is_malformed_input() || matches!(err, SonarError::Config(_)) {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(err.to_string())
    }
}

/// Convert a Python cell into a raw value.
fn raw_value(value: &Bound<'_, PyAny>) -> RawValue {
    if value.is_none() {
        return RawValue::Empty;
    }
    if let Ok(b) = value.downcast::<PyBool>() {
        return RawValue::Bool(b.is_true());
    }
    if let Ok(i) = value.extract::<i64>() {
        return RawValue::Integer(i);
    }
    if let Ok(f) = value.extract::<f64>() {
        return RawValue::Float(f);
    }
    if let Ok(s) = value.extract::<String>() {
        return RawValue::Text(s);
    }
    match value.str() {
        Ok(s) => RawValue::Text(s.to_string()),
        Err(_) => RawValue::Empty,
    }
}

/// Convert a list of row dicts into raw records.
fn raw_records(records: &Bound<'_, PyList>) -> PyResult<Vec<RawRecord>> {
    records
        .iter()
        .map(|item| {
            let row = item.downcast::<PyDict>()?;
            let mut record = RawRecord::with_capacity(row.len());
            for (key, value) in row.iter() {
                record.insert(key.str()?.to_string(), raw_value(&value));
            }
            Ok(record)
        })
        .collect()
}

/// Convert a list of entry dicts (`Pair`, `Price`, `Expiry`) into level entries.
fn level_entries(entries: &Bound<'_, PyList>) -> PyResult<Vec<LevelEntry>> {
    entries
        .iter()
        .map(|item| {
            let row = item.downcast::<PyDict>()?;
            let pair = row.get_item("Pair")?.map(|v| raw_value(&v));
            let price = row.get_item("Price")?.map(|v| raw_value(&v));
            let expiry = row.get_item("Expiry")?.map(|v| raw_value(&v));
            Ok(LevelEntry {
                pair,
                price,
                expiry,
            })
        })
        .collect()
}

/// Parse an ISO date, defaulting to the local current date.
fn run_date(today: Option<&str>) -> PyResult<NaiveDate> {
    match today {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| PyValueError::new_err(format!("invalid date '{s}': {e}"))),
        None => Ok(PipelineRunner::today_local()),
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Order pipeline with a fixed configuration.
#[pyclass(name = "SonarPipeline")]
pub struct PySonarPipeline {
    inner: PipelineRunner,
}

#[pymethods]
impl PySonarPipeline {
    /// Create a pipeline, optionally overriding the defaults with a JSON config.
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => Config::from_json_str(json).map_err(to_py_err)?,
            None => Config::default(),
        };
        let inner = PipelineRunner::new(config).map_err(to_py_err)?;
        Ok(PySonarPipeline { inner })
    }

    /// Consolidated order table rows as dicts of display strings.
    #[pyo3(signature = (records, today=None))]
    fn display_rows<'py>(
        &self,
        py: Python<'py>,
        records: &Bound<'py, PyList>,
        today: Option<&str>,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let records = raw_records(records)?;
        let report = self
            .inner
            .run_display(&records, run_date(today)?)
            .map_err(to_py_err)?;

        report
            .rows
            .iter()
            .map(|row| {
                let dict = PyDict::new_bound(py);
                dict.set_item("Pair", &row.pair)?;
                dict.set_item("Order", row.order.as_str())?;
                dict.set_item("Price", &row.price)?;
                dict.set_item("Volume", &row.volume)?;
                dict.set_item("Expiry", &row.expiry)?;
                Ok(dict)
            })
            .collect()
    }

    /// Block-trade export as a JSON array string.
    #[pyo3(signature = (records, today=None))]
    fn export_json(&self, records: &Bound<'_, PyList>, today: Option<&str>) -> PyResult<String> {
        let records = raw_records(records)?;
        let report = self
            .inner
            .run_export(&records, run_date(today)?)
            .map_err(to_py_err)?;
        report.to_json().map_err(to_py_err)
    }

    /// Descending price levels per pair from export-style entries.
    #[pyo3(signature = (entries, today=None))]
    fn price_levels(
        &self,
        entries: &Bound<'_, PyList>,
        today: Option<&str>,
    ) -> PyResult<BTreeMap<String, Vec<f64>>> {
        let entries = level_entries(entries)?;
        Ok(self
            .inner
            .price_levels_from_entries(&entries, run_date(today)?)
            .into_map())
    }

    /// Whether a volume is a block trade for a pair.
    fn is_block_trade(&self, pair: &str, volume: f64) -> bool {
        self.inner.is_block_trade(pair, volume)
    }

    /// The configured thresholds.
    fn thresholds(&self) -> BTreeMap<String, u64> {
        self.inner
            .config()
            .thresholds
            .iter()
            .map(|(pair, threshold)| (pair.to_string(), threshold))
            .collect()
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// Install a tracing subscriber. Returns False if one was already installed.
#[pyfunction]
#[pyo3(signature = (level=None))]
fn init_logging(level: Option<&str>) -> PyResult<bool> {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| PyValueError::new_err(e.to_string()))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok())
}

/// Sonar - currency option order consolidation for Python.
#[pymodule]
fn sonar_native(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    m.add_class::<PySonarPipeline>()?;

    Ok(())
}
