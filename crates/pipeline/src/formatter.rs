//! Presentation formatting.
//!
//! Turns classified groups into display strings. Runs after all grouping
//! and classification; nothing parses these strings back.

use chrono::NaiveDate;
use serde::Serialize;
use sonar_core::format::format_price;
use sonar_core::{ClassifiedGroup, DateConfig, OrderType};

/// Group volume with thousands separators: `150000000` -> `"150,000,000"`.
pub fn format_volume(volume: u64) -> String {
    let digits = volume.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render a date with a strftime format.
pub fn format_date(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}

/// One row of the order table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    #[serde(rename = "Pair")]
    pub pair: String,
    #[serde(rename = "Order")]
    pub order: OrderType,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Volume")]
    pub volume: String,
    #[serde(rename = "Expiry")]
    pub expiry: String,
    #[serde(skip)]
    pub is_block_trade: bool,
}

impl DisplayRow {
    pub fn is_call(&self) -> bool {
        self.order.is_call()
    }

    pub fn is_put(&self) -> bool {
        self.order.is_put()
    }
}

/// Field-level formatter for classified groups.
#[derive(Debug, Clone)]
pub struct PresentationFormatter {
    display_format: String,
}

impl PresentationFormatter {
    pub fn new(dates: &DateConfig) -> Self {
        Self {
            display_format: dates.display_format.clone(),
        }
    }

    /// Format one group.
    pub fn display_row(&self, classified: &ClassifiedGroup) -> DisplayRow {
        let group = &classified.group;
        DisplayRow {
            pair: group.pair.clone(),
            order: group.order.clone(),
            price: format_price(group.price),
            volume: format_volume(group.whole_volume()),
            expiry: format_date(group.expiry, &self.display_format),
            is_block_trade: classified.is_block_trade,
        }
    }

    /// Format all groups, keeping their order.
    pub fn display_rows(&self, groups: &[ClassifiedGroup]) -> Vec<DisplayRow> {
        groups.iter().map(|g| self.display_row(g)).collect()
    }
}

impl Default for PresentationFormatter {
    fn default() -> Self {
        Self::new(&DateConfig::default())
    }
}
