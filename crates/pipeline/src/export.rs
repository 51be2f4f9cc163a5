//! Block-trade export records.

use crate::formatter::format_date;
use serde::{Deserialize, Serialize};
use sonar_core::{ClassifiedGroup, Error, OrderType, Result};
use std::io::Write;

/// One exported group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "Trade Date")]
    pub trade_date: String,
    #[serde(rename = "Pair")]
    pub pair: String,
    #[serde(rename = "Order")]
    pub order: OrderType,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
    #[serde(rename = "Expiry")]
    pub expiry: String,
    #[serde(rename = "IsBlockTrade")]
    pub is_block_trade: bool,
}

impl ExportRecord {
    /// Build a record from an export-mode group.
    ///
    /// Fails if the group carries no trade date, which only happens when a
    /// display-mode group is passed in.
    pub fn from_classified(classified: &ClassifiedGroup, date_format: &str) -> Result<Self> {
        let group = &classified.group;
        let trade_date = group.trade_date.ok_or_else(|| {
            Error::internal(format!(
                "group {} {} {} has no trade date",
                group.pair, group.order, group.price
            ))
        })?;

        Ok(Self {
            trade_date: format_date(trade_date, date_format),
            pair: group.pair.clone(),
            order: group.order.clone(),
            price: group.price,
            volume: group.volume,
            expiry: format_date(group.expiry, date_format),
            is_block_trade: classified.is_block_trade,
        })
    }
}

/// Render records as a pretty-printed JSON array.
pub fn export_json(records: &[ExportRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Write records as a pretty-printed JSON array.
pub fn write_json<W: Write>(writer: W, records: &[ExportRecord]) -> Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}
