//! Ledger sinks: console table and CSV spreadsheet.

use anyhow::{Context, Result};
use insync_core::LedgerRow;
use std::path::Path;

pub const DEFAULT_EXPORT_PATH: &str = "operation_history.csv";

const HEADERS: [&str; 7] = [
    "date",
    "title",
    "description",
    "Expense",
    "Income",
    "postfix",
    "type",
];

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Write rows as a CSV spreadsheet: header line, then one line per row.
/// Absent expense/income become empty cells.
pub fn write_csv(rows: &[LedgerRow], path: &Path) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    write_records(&mut wtr, rows)?;
    wtr.flush().with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn write_records<W: std::io::Write>(wtr: &mut csv::Writer<W>, rows: &[LedgerRow]) -> Result<()> {
    wtr.write_record(HEADERS)?;
    for row in rows {
        wtr.write_record(&[
            row.date.clone(),
            row.title.clone(),
            row.description.clone(),
            cell(row.expense),
            cell(row.income),
            row.postfix.clone(),
            row.kind.label().to_string(),
        ])?;
    }
    Ok(())
}

/// Print rows as a fixed-width console table.
pub fn print_table(rows: &[LedgerRow]) {
    if rows.is_empty() {
        println!("(no operations)");
        return;
    }
    println!(
        "{:<19} | {:<28} | {:<32} | {:>10} | {:>10} | {:<4} | {}",
        "date", "title", "description", "expense", "income", "unit", "type"
    );
    for row in rows {
        println!(
            "{:<19} | {:<28} | {:<32} | {:>10} | {:>10} | {:<4} | {}",
            row.date,
            row.title,
            row.description,
            cell(row.expense),
            cell(row.income),
            row.postfix,
            row.kind.label(),
        );
    }
}
