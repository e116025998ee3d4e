//! Small-number redaction.
//!
//! Counts at or below a threshold could identify individuals, so any row where the numerator or
//! denominator is in `0..=threshold` has its numerator, denominator, value and rate replaced by
//! [`Cell::Redacted`]. Zero counts are suppressed too.
//!
//! Redaction only ever adds `Redacted` cells. A row that has already been redacted no longer has
//! counts in range, so it passes through untouched, and redacting twice is the same as once.
use crate::{
    table::{Cell, MeasureRow, MeasureTable},
    Range,
};
use qu::ick_use::*;

/// The default threshold for small-number suppression.
pub const DEFAULT_THRESHOLD: u64 = 5;

/// Whether `count` should be suppressed. Missing and already-redacted cells never are.
pub fn in_suppression_range(count: Cell<u64>, threshold: u64) -> bool {
    Range::up_to_inclusive(threshold).contains_opt(count.as_ref().value())
}

/// Whether any count in the row is small enough to need suppressing.
pub fn needs_redaction(row: &MeasureRow, threshold: u64) -> bool {
    in_suppression_range(row.numerator, threshold)
        || in_suppression_range(row.denominator, threshold)
}

/// Mask every row of `table` with a numerator or denominator in `0..=threshold`.
pub fn redact_small_numbers(mut table: MeasureTable, threshold: u64) -> MeasureTable {
    let mut redacted = 0;
    for row in table.rows_mut() {
        if needs_redaction(row, threshold) {
            row.numerator = Cell::Redacted;
            row.denominator = Cell::Redacted;
            row.value = Cell::Redacted;
            row.rate = Cell::Redacted;
            redacted += 1;
        }
    }
    event!(
        Level::INFO,
        "redacted {} of {} rows for measure {} (counts <= {})",
        redacted,
        table.len(),
        table.measure().id,
        threshold
    );
    table
}
