use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_IN_STOCK_PHRASE: &str = "add to cart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    In,
    Out,
}

impl StockStatus {
    /// Classify a call-to-action button by its text. Matching is a
    /// case-insensitive substring test against `in_stock_phrase`.
    pub fn from_button_text(text: &str, in_stock_phrase: &str) -> Self {
        let text = text.trim().to_lowercase();
        if text.contains(&in_stock_phrase.to_lowercase()) {
            StockStatus::In
        } else {
            StockStatus::Out
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::In => f.write_str("IN"),
            StockStatus::Out => f.write_str("OUT"),
        }
    }
}
