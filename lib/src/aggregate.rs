//! Re-deriving the whole-population table from raw rows.
//!
//! The measures engine hasn't always produced a usable ungrouped total, so for those measures we
//! sum the counts per date ourselves and recompute the ratio.
use crate::table::{ratio, Cell, MeasureRow, MeasureTable};
use std::collections::BTreeMap;

/// Add two counts, skipping missing ones. A redacted count makes the total redacted.
fn add_counts(total: Cell<u64>, count: Cell<u64>) -> Cell<u64> {
    match (total, count) {
        (Cell::Redacted, _) | (_, Cell::Redacted) => Cell::Redacted,
        (total, Cell::Missing) => total,
        (Cell::Value(total), Cell::Value(count)) => Cell::Value(total.saturating_add(count)),
        (Cell::Missing, count) => count,
    }
}

/// Collapse `table` to one row per distinct date, summing numerators and denominators and
/// recomputing the ratio. Group values are dropped and rows come out in date order.
///
/// A date whose rows only have missing counts sums to 0.
pub fn aggregate_by_date(table: MeasureTable) -> MeasureTable {
    let mut measure = table.measure().clone();
    measure.group_by.clear();

    let mut totals = BTreeMap::new();
    for row in table.into_rows() {
        let (numerator, denominator) = totals
            .entry(row.date)
            .or_insert((Cell::Value(0), Cell::Value(0)));
        *numerator = add_counts(*numerator, row.numerator);
        *denominator = add_counts(*denominator, row.denominator);
    }

    let rows = totals
        .into_iter()
        .map(|(date, (numerator, denominator))| MeasureRow {
            date,
            group: vec![],
            numerator,
            denominator,
            value: ratio(numerator, denominator),
            rate: Cell::Missing,
        })
        .collect();
    MeasureTable::new(measure, rows)
}
