//! Core data types for the sonar pipeline.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Price type with ordering support.
pub type Price = OrderedFloat<f64>;

/// A single cell as read from a source sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl RawValue {
    /// Trimmed text form for identifier-like cells (pair, order).
    ///
    /// Numbers are rendered with their natural formatting; booleans and
    /// empty cells have no text.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Float(f) if f.is_finite() => f.to_string(),
            _ => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Numeric coercion: numbers pass through, text is trimmed and parsed.
    ///
    /// Non-finite values are treated as non-numeric.
    pub fn to_number(&self) -> Option<f64> {
        let value = match self {
            RawValue::Integer(i) => *i as f64,
            RawValue::Float(f) => *f,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RawValue::Bool(_) | RawValue::Empty => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Whether the cell holds nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<f64> for RawValue {
    fn from(f: f64) -> Self {
        RawValue::Float(f)
    }
}

/// One source row: column name to cell value.
pub type RawRecord = HashMap<String, RawValue>;

/// Concatenate per-worksheet record sets in worksheet order.
pub fn concat_sources<I>(sources: I) -> Vec<RawRecord>
where
    I: IntoIterator<Item = Vec<RawRecord>>,
{
    sources.into_iter().flatten().collect()
}

/// Option order type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderType {
    Call,
    Put,
    /// Any other value, kept verbatim (upper-cased).
    Other(String),
}

impl OrderType {
    /// Parse an order cell. Input is trimmed and upper-cased.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "" => None,
            "CALL" => Some(OrderType::Call),
            "PUT" => Some(OrderType::Put),
            _ => Some(OrderType::Other(upper)),
        }
    }

    /// Canonical text.
    pub fn as_str(&self) -> &str {
        match self {
            OrderType::Call => "CALL",
            OrderType::Put => "PUT",
            OrderType::Other(s) => s,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, OrderType::Call)
    }

    pub fn is_put(&self) -> bool {
        matches!(self, OrderType::Put)
    }
}

// Ordered by text so grouped output sorts the way the sheet values would.
impl Ord for OrderType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for OrderType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for OrderType {
    fn from(s: String) -> Self {
        OrderType::parse(&s).unwrap_or(OrderType::Other(s))
    }
}

impl From<OrderType> for String {
    fn from(o: OrderType) -> Self {
        o.as_str().to_string()
    }
}

/// Which downstream consumer a run feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineMode {
    /// Dashboard table: grouped by pair/order/price, trade date ignored.
    Display,
    /// Block-trade export: grouped by trade date/pair/order/price.
    Export,
}

/// A normalized order row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Currency pair code (upper case).
    pub pair: String,
    /// Order type.
    pub order: OrderType,
    /// Finite price.
    pub price: f64,
    /// Cleaned, non-negative volume. Fractional parts are kept here; the
    /// display path truncates per row, the export path sums as is.
    pub volume: f64,
    /// Expiry date.
    pub expiry: NaiveDate,
    /// Trade date, only populated in export mode.
    pub trade_date: Option<NaiveDate>,
}

impl TradeRecord {
    /// Volume with the fractional part discarded.
    #[inline]
    pub fn whole_volume(&self) -> u64 {
        self.volume.trunc() as u64
    }

    /// Grouping key for the given mode.
    pub fn key(&self, mode: PipelineMode) -> GroupKey {
        GroupKey {
            trade_date: match mode {
                PipelineMode::Display => None,
                PipelineMode::Export => self.trade_date,
            },
            pair: self.pair.clone(),
            order: self.order.clone(),
            price: OrderedFloat(self.price),
        }
    }
}

/// Why a row was excluded as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MalformedReason {
    InvalidExpiry,
    InvalidTradeDate,
    InvalidVolume,
    InvalidPrice,
    MissingPair,
    MissingOrder,
}

impl MalformedReason {
    pub const ALL: [MalformedReason; 6] = [
        MalformedReason::InvalidExpiry,
        MalformedReason::InvalidTradeDate,
        MalformedReason::InvalidVolume,
        MalformedReason::InvalidPrice,
        MalformedReason::MissingPair,
        MalformedReason::MissingOrder,
    ];
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MalformedReason::InvalidExpiry => "invalid expiry",
            MalformedReason::InvalidTradeDate => "invalid trade date",
            MalformedReason::InvalidVolume => "invalid volume",
            MalformedReason::InvalidPrice => "invalid price",
            MalformedReason::MissingPair => "missing pair",
            MalformedReason::MissingOrder => "missing order",
        };
        f.write_str(s)
    }
}

/// Result of normalizing one raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(TradeRecord),
    DroppedMalformed(MalformedReason),
    /// Expiry parsed but lies strictly before the run date.
    DroppedExpired { expiry: NaiveDate },
}

impl RowOutcome {
    /// The accepted record, if any.
    pub fn accepted(self) -> Option<TradeRecord> {
        match self {
            RowOutcome::Accepted(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, RowOutcome::Accepted(_))
    }
}

/// Structured grouping key.
///
/// Field order defines the sort: trade date, pair, order text, price.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub trade_date: Option<NaiveDate>,
    pub pair: String,
    pub order: OrderType,
    pub price: Price,
}

/// Records sharing one key, merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedGroup {
    /// Trade date (export mode only).
    pub trade_date: Option<NaiveDate>,
    pub pair: String,
    pub order: OrderType,
    pub price: f64,
    /// Summed volume.
    pub volume: f64,
    /// Earliest expiry among members.
    pub expiry: NaiveDate,
    /// Number of contributing rows.
    pub row_count: u32,
}

impl ConsolidatedGroup {
    /// Summed volume with any fractional part discarded.
    #[inline]
    pub fn whole_volume(&self) -> u64 {
        self.volume.trunc() as u64
    }

    pub fn key(&self) -> GroupKey {
        GroupKey {
            trade_date: self.trade_date,
            pair: self.pair.clone(),
            order: self.order.clone(),
            price: OrderedFloat(self.price),
        }
    }
}

/// A consolidated group with its block-trade flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedGroup {
    pub group: ConsolidatedGroup,
    pub is_block_trade: bool,
}
