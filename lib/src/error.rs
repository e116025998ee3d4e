use crate::ArcStr;
use thiserror::Error;

/// Problems with the shape or content of a measure table.
///
/// These are raised as soon as they are seen. There is no recovery: the caller attaches the file
/// or measure being processed as context and aborts.
#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("column \"{0}\" is missing from the measure table")]
    MissingColumn(ArcStr),

    #[error("measure \"{0}\" has no rows")]
    EmptyTable(ArcStr),

    #[error("invalid value \"{value}\" in column \"{column}\" (line {line})")]
    InvalidCell {
        column: ArcStr,
        value: String,
        line: u64,
    },
}
