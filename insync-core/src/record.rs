//! Wire and ledger record types for the operation history.
//!
//! `RawOperation` mirrors one element of the `history/items` response.
//! `LedgerRow` is the normalized output of reconciliation, ready for a
//! console table or spreadsheet sink.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format the history API uses (`20240101120000`).
pub const API_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Display format for ledger rows. Fixed-width and zero-padded, so
/// lexicographic order equals chronological order.
pub const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A signed amount with its currency/unit label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    #[serde(default)]
    pub postfix: String,
}

/// Carrier of the category tag. The URL is an opaque signal from the
/// remote system; only substring matching against it is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icon {
    #[serde(default)]
    pub icon_url: String,
}

/// One raw operation as returned by `POST /history/items`.
///
/// `id`, `date` and `amount` are required by the reconciliation engine but
/// optional on the wire model, so a record violating the remote contract
/// surfaces as a typed engine error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Option<Money>,
    /// Secondary amount in another currency, present only on some
    /// categories (e.g. foreign-currency debits).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_amount: Option<Money>,
    #[serde(default)]
    pub icon: Icon,
}

/// Operation category, derived from the icon tag by substring match.
/// Unknown tags are `Plain` by design, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Transfer,
    CurrencyExchange,
    Plain,
}

impl RawOperation {
    pub fn category(&self) -> Category {
        let url = &self.icon.icon_url;
        if url.contains("TRANSFER") {
            Category::Transfer
        } else if url.contains("CURRENCY_EXCHANGE") {
            Category::CurrencyExchange
        } else {
            Category::Plain
        }
    }
}

/// Ledger row classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Transfer,
    Exchange,
    Expense,
    Income,
}

impl RowKind {
    pub fn label(self) -> &'static str {
        match self {
            RowKind::Transfer => "Transfer",
            RowKind::Exchange => "Exchange",
            RowKind::Expense => "Expense",
            RowKind::Income => "Income",
        }
    }
}

/// One reconciled economic event.
///
/// A `Transfer` row carries the same magnitude in both `expense` and
/// `income` (one movement between own accounts); an `Exchange` row carries
/// the debited and credited magnitudes of a conversion; plain rows set
/// exactly one of the two.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub date: String,
    pub title: String,
    pub description: String,
    pub expense: Option<f64>,
    pub income: Option<f64>,
    pub postfix: String,
    #[serde(rename = "type")]
    pub kind: RowKind,
}

/// Reformat an API timestamp (`YYYYMMDDhhmmss`) for display.
pub fn format_timestamp(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw, API_DATE_FORMAT)
        .ok()
        .map(|dt| dt.format(LEDGER_DATE_FORMAT).to_string())
}
