//! Reconciliation engine: pairs logically related operations and
//! normalizes the rest into uniform ledger rows.
//!
//! Three passes share one claimed-id set, local to a single call:
//!
//! 1. transfer pairing (same date, exactly opposite amounts),
//! 2. currency-exchange pairing (the income leg's secondary amount
//!    carries the true debited value),
//! 3. plain records (everything still unclaimed).
//!
//! When several same-day candidates qualify for a pairing, the first in
//! forward scan order wins. That keeps the result deterministic for a
//! fixed input order, but among duplicate same-day transfers of identical
//! magnitude it is not guaranteed to pick the true economic counterpart.

use std::collections::HashSet;

use thiserror::Error;

use crate::record::{format_timestamp, Category, LedgerRow, Money, RawOperation, RowKind};

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A record lacks a field the ledger cannot do without. The whole
    /// batch is rejected; a financial record must never be dropped
    /// silently.
    #[error("operation #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("operation `{id}` has unparseable timestamp `{value}`")]
    BadTimestamp { id: String, value: String },
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

/// A validated, borrowed view over one raw operation.
struct Entry<'a> {
    id: &'a str,
    date: &'a str,
    formatted_date: String,
    title: &'a str,
    description: &'a str,
    amount: f64,
    postfix: &'a str,
    operation: Option<&'a Money>,
    category: Category,
}

fn check(index: usize, op: &RawOperation) -> Result<Entry<'_>> {
    let id = op
        .id
        .as_deref()
        .ok_or(ReconcileError::MissingField { index, field: "id" })?;
    let date = op
        .date
        .as_deref()
        .ok_or(ReconcileError::MissingField { index, field: "date" })?;
    let amount = op
        .amount
        .as_ref()
        .ok_or(ReconcileError::MissingField {
            index,
            field: "amount",
        })?;
    let formatted_date = format_timestamp(date).ok_or_else(|| ReconcileError::BadTimestamp {
        id: id.to_string(),
        value: date.to_string(),
    })?;
    Ok(Entry {
        id,
        date,
        formatted_date,
        title: &op.title,
        description: &op.description,
        amount: amount.amount,
        postfix: &amount.postfix,
        operation: op.operation_amount.as_ref(),
        category: op.category(),
    })
}

/// Reconcile a raw operation batch into normalized ledger rows.
///
/// Total over any finite input (empty in, empty out) and pure: the same
/// batch in the same order always yields the same rows. Malformed records
/// abort the whole batch with a [`ReconcileError`]; no partial output is
/// produced.
pub fn reconcile(operations: &[RawOperation]) -> Result<Vec<LedgerRow>> {
    let entries = operations
        .iter()
        .enumerate()
        .map(|(i, op)| check(i, op))
        .collect::<Result<Vec<_>>>()?;

    let mut claimed: HashSet<&str> = HashSet::new();
    let mut rows = Vec::with_capacity(entries.len());

    pair_transfers(&entries, &mut claimed, &mut rows);
    pair_exchanges(&entries, &mut claimed, &mut rows);
    emit_plain(&entries, &claimed, &mut rows);

    // Dates are already display-formatted; lexicographic == chronological.
    // Stable sort keeps pass order among equal dates.
    rows.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(rows)
}

/// Pass 1: same-day pairs of opposite-sign transfers between own accounts
/// collapse into one row. The positive leg names the source, the negative
/// leg the destination.
fn pair_transfers<'a>(
    entries: &[Entry<'a>],
    claimed: &mut HashSet<&'a str>,
    rows: &mut Vec<LedgerRow>,
) {
    for (i, a) in entries.iter().enumerate() {
        if a.category != Category::Transfer || claimed.contains(a.id) {
            continue;
        }
        let candidate = entries.iter().enumerate().find(|(j, b)| {
            *j != i
                && !claimed.contains(b.id)
                && b.date == a.date
                && b.amount == -a.amount
                && b.category == Category::Transfer
        });
        let Some((_, b)) = candidate else { continue };

        let title = if b.amount > 0.0 { b.description } else { a.description };
        let description = if b.amount < 0.0 { b.description } else { a.description };

        rows.push(LedgerRow {
            date: a.formatted_date.clone(),
            title: title.to_string(),
            description: description.to_string(),
            expense: Some(a.amount.abs()),
            income: Some(a.amount.abs()),
            postfix: a.postfix.to_string(),
            kind: RowKind::Transfer,
        });
        claimed.insert(a.id);
        claimed.insert(b.id);
    }
}

/// Pass 2: same-day pairs of currency-exchange legs. The income leg is the
/// one with a positive amount and a present secondary amount; that
/// secondary amount must be strictly negative, it encodes the debited
/// value in the source currency.
fn pair_exchanges<'a>(
    entries: &[Entry<'a>],
    claimed: &mut HashSet<&'a str>,
    rows: &mut Vec<LedgerRow>,
) {
    for (i, a) in entries.iter().enumerate() {
        if a.category != Category::CurrencyExchange || claimed.contains(a.id) {
            continue;
        }
        for (j, b) in entries.iter().enumerate() {
            if j == i || claimed.contains(b.id) {
                continue;
            }
            if b.date != a.date || b.category != Category::CurrencyExchange {
                continue;
            }

            let (income, expense) = if a.amount > 0.0 && a.operation.is_some() {
                (a, b)
            } else if b.amount > 0.0 && b.operation.is_some() {
                (b, a)
            } else {
                continue;
            };
            let Some(debit) = income.operation.filter(|m| m.amount < 0.0) else {
                continue;
            };

            rows.push(LedgerRow {
                date: a.formatted_date.clone(),
                title: income.description.to_string(),
                description: expense.description.to_string(),
                expense: Some(debit.amount.abs()),
                income: Some(income.amount.abs()),
                // Cross-currency pair, no single unit to report.
                postfix: String::new(),
                kind: RowKind::Exchange,
            });
            claimed.insert(income.id);
            claimed.insert(expense.id);
            break;
        }
    }
}

/// Pass 3: everything unclaimed becomes a plain debit or credit. A
/// foreign-currency debit reports the secondary amount and its unit.
fn emit_plain(entries: &[Entry<'_>], claimed: &HashSet<&str>, rows: &mut Vec<LedgerRow>) {
    for e in entries {
        if claimed.contains(e.id) {
            continue;
        }
        let (amt, postfix) = match e.operation {
            Some(op) if e.amount < 0.0 => (op.amount, op.postfix.as_str()),
            _ => (e.amount, e.postfix),
        };
        let (expense, income, kind) = if amt < 0.0 {
            (Some(amt.abs()), None, RowKind::Expense)
        } else {
            // Zero lands here: reported as an income of 0 rather than an
            // empty row.
            (None, Some(amt.abs()), RowKind::Income)
        };
        rows.push(LedgerRow {
            date: e.formatted_date.clone(),
            title: e.title.to_string(),
            description: e.description.to_string(),
            expense,
            income,
            postfix: postfix.to_string(),
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Icon;

    const TRANSFER_ICON: &str = "https://cdn/icons/TRANSFER_OWN.png";
    const EXCHANGE_ICON: &str = "https://cdn/icons/CURRENCY_EXCHANGE.png";

    fn money(amount: f64, postfix: &str) -> Money {
        Money {
            amount,
            postfix: postfix.into(),
        }
    }

    fn op(id: &str, date: &str, amount: f64, icon: &str) -> RawOperation {
        RawOperation {
            id: Some(id.into()),
            date: Some(date.into()),
            title: format!("title-{id}"),
            description: format!("desc-{id}"),
            amount: Some(money(amount, "BYN")),
            operation_amount: None,
            icon: Icon {
                icon_url: icon.into(),
            },
        }
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(reconcile(&[]).unwrap(), vec![]);
    }

    #[test]
    fn test_plain_debit() {
        let mut coffee = op("1", "20240101120000", -50.0, "");
        coffee.title = "Coffee".into();
        coffee.description = "Cafe".into();

        let rows = reconcile(&[coffee]).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date, "2024-01-01 12:00:00");
        assert_eq!(row.title, "Coffee");
        assert_eq!(row.description, "Cafe");
        assert_eq!(row.expense, Some(50.0));
        assert_eq!(row.income, None);
        assert_eq!(row.postfix, "BYN");
        assert_eq!(row.kind, RowKind::Expense);
    }

    #[test]
    fn test_plain_credit() {
        let rows = reconcile(&[op("1", "20240101120000", 120.0, "")]).unwrap();
        assert_eq!(rows[0].income, Some(120.0));
        assert_eq!(rows[0].expense, None);
        assert_eq!(rows[0].kind, RowKind::Income);
    }

    #[test]
    fn test_zero_amount_classifies_as_income() {
        let rows = reconcile(&[op("1", "20240101120000", 0.0, "")]).unwrap();
        assert_eq!(rows[0].kind, RowKind::Income);
        assert_eq!(rows[0].income, Some(0.0));
        assert_eq!(rows[0].expense, None);
    }

    #[test]
    fn test_transfer_pair() {
        let mut out = op("1", "20240101120000", -100.0, TRANSFER_ICON);
        out.description = "to savings".into();
        let mut inn = op("2", "20240101120000", 100.0, TRANSFER_ICON);
        inn.description = "from checking".into();

        let rows = reconcile(&[out, inn]).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date, "2024-01-01 12:00:00");
        assert_eq!(row.title, "from checking");
        assert_eq!(row.description, "to savings");
        assert_eq!(row.expense, Some(100.0));
        assert_eq!(row.income, Some(100.0));
        assert_eq!(row.postfix, "BYN");
        assert_eq!(row.kind, RowKind::Transfer);
    }

    #[test]
    fn test_transfer_requires_same_date() {
        let rows = reconcile(&[
            op("1", "20240101120000", -100.0, TRANSFER_ICON),
            op("2", "20240102120000", 100.0, TRANSFER_ICON),
        ])
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.kind != RowKind::Transfer));
    }

    #[test]
    fn test_transfer_requires_exact_opposite_amounts() {
        let rows = reconcile(&[
            op("1", "20240101120000", -100.0, TRANSFER_ICON),
            op("2", "20240101120000", 90.0, TRANSFER_ICON),
        ])
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, RowKind::Expense);
        assert_eq!(rows[1].kind, RowKind::Income);
    }

    #[test]
    fn test_unpaired_transfer_falls_through_to_plain() {
        let rows = reconcile(&[op("1", "20240101120000", -100.0, TRANSFER_ICON)]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RowKind::Expense);
        assert_eq!(rows[0].expense, Some(100.0));
    }

    #[test]
    fn test_first_candidate_wins_among_duplicates() {
        // Two positive legs qualify; the earlier one by input index is
        // paired, the other falls through as plain income.
        let rows = reconcile(&[
            op("1", "20240101120000", -100.0, TRANSFER_ICON),
            op("2", "20240101120000", 100.0, TRANSFER_ICON),
            op("3", "20240101120000", 100.0, TRANSFER_ICON),
        ])
        .unwrap();
        assert_eq!(rows.len(), 2);

        let transfer = rows.iter().find(|r| r.kind == RowKind::Transfer).unwrap();
        assert_eq!(transfer.title, "desc-2");

        let leftover = rows.iter().find(|r| r.kind == RowKind::Income).unwrap();
        assert_eq!(leftover.title, "title-3");
        assert_eq!(leftover.income, Some(100.0));
    }

    fn exchange_pair() -> (RawOperation, RawOperation) {
        let mut credited = op("usd", "20240102120000", 50.0, EXCHANGE_ICON);
        credited.description = "USD account".into();
        credited.amount = Some(money(50.0, "USD"));
        credited.operation_amount = Some(money(-160.0, "BYN"));

        let mut debited = op("byn", "20240102120000", -160.0, EXCHANGE_ICON);
        debited.description = "BYN account".into();

        (credited, debited)
    }

    #[test]
    fn test_exchange_pair() {
        let (credited, debited) = exchange_pair();
        let rows = reconcile(&[credited, debited]).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.kind, RowKind::Exchange);
        assert_eq!(row.title, "USD account");
        assert_eq!(row.description, "BYN account");
        assert_eq!(row.expense, Some(160.0));
        assert_eq!(row.income, Some(50.0));
        assert_eq!(row.postfix, "");
    }

    #[test]
    fn test_exchange_income_leg_found_in_either_position() {
        let (credited, debited) = exchange_pair();
        let rows = reconcile(&[debited, credited]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RowKind::Exchange);
        assert_eq!(rows[0].title, "USD account");
        assert_eq!(rows[0].expense, Some(160.0));
        assert_eq!(rows[0].income, Some(50.0));
    }

    #[test]
    fn test_exchange_rejects_nonnegative_secondary_amount() {
        let (mut credited, debited) = exchange_pair();
        credited.operation_amount = Some(money(160.0, "BYN"));

        let rows = reconcile(&[credited, debited]).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.kind != RowKind::Exchange));
    }

    #[test]
    fn test_exchange_requires_both_legs_tagged() {
        let (credited, mut debited) = exchange_pair();
        debited.icon = Icon::default();

        let rows = reconcile(&[credited, debited]).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.kind != RowKind::Exchange));
    }

    #[test]
    fn test_foreign_currency_debit_uses_secondary_amount() {
        let mut order = op("1", "20240101120000", -30.0, "");
        order.operation_amount = Some(money(-9.5, "USD"));

        let rows = reconcile(&[order]).unwrap();
        assert_eq!(rows[0].expense, Some(9.5));
        assert_eq!(rows[0].postfix, "USD");
        assert_eq!(rows[0].kind, RowKind::Expense);
    }

    #[test]
    fn test_secondary_amount_ignored_for_credits() {
        let mut refund = op("1", "20240101120000", 30.0, "");
        refund.operation_amount = Some(money(-9.5, "USD"));

        let rows = reconcile(&[refund]).unwrap();
        assert_eq!(rows[0].income, Some(30.0));
        assert_eq!(rows[0].postfix, "BYN");
    }

    #[test]
    fn test_missing_amount_aborts_batch() {
        let mut bad = op("2", "20240101120000", 1.0, "");
        bad.amount = None;
        let ops = vec![op("1", "20240101120000", -50.0, ""), bad];

        let err = reconcile(&ops).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MissingField {
                index: 1,
                field: "amount"
            }
        ));
    }

    #[test]
    fn test_missing_id_and_date_abort_batch() {
        let mut no_id = op("1", "20240101120000", -50.0, "");
        no_id.id = None;
        assert!(matches!(
            reconcile(&[no_id]).unwrap_err(),
            ReconcileError::MissingField { field: "id", .. }
        ));

        let mut no_date = op("1", "20240101120000", -50.0, "");
        no_date.date = None;
        assert!(matches!(
            reconcile(&[no_date]).unwrap_err(),
            ReconcileError::MissingField { field: "date", .. }
        ));
    }

    #[test]
    fn test_bad_timestamp_aborts_batch() {
        let bad = op("1", "2024-01-01", -50.0, "");
        assert!(matches!(
            reconcile(&[bad]).unwrap_err(),
            ReconcileError::BadTimestamp { .. }
        ));
    }

    #[test]
    fn test_rows_sorted_by_date() {
        let rows = reconcile(&[
            op("1", "20240105120000", -1.0, ""),
            op("2", "20240101120000", 2.0, ""),
            op("3", "20240103120000", -3.0, ""),
        ])
        .unwrap();
        let dates: Vec<_> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(
            dates,
            [
                "2024-01-01 12:00:00",
                "2024-01-03 12:00:00",
                "2024-01-05 12:00:00"
            ]
        );
    }

    #[test]
    fn test_sort_is_stable_among_equal_dates() {
        let rows = reconcile(&[
            op("1", "20240101120000", -1.0, ""),
            op("2", "20240101120000", -2.0, ""),
            op("3", "20240101120000", -3.0, ""),
        ])
        .unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["title-1", "title-2", "title-3"]);
    }

    #[test]
    fn test_reconcile_is_pure() {
        let ops = vec![
            op("1", "20240101120000", -100.0, TRANSFER_ICON),
            op("2", "20240101120000", 100.0, TRANSFER_ICON),
            op("3", "20240102120000", -7.5, ""),
        ];
        assert_eq!(reconcile(&ops).unwrap(), reconcile(&ops).unwrap());
    }
}
