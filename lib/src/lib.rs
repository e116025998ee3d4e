pub mod aggregate;
pub mod cli;
mod error;
pub mod measure;
pub mod pipeline;
pub mod plot;
mod range;
pub mod rate;
pub mod redact;
pub mod study;
pub mod table;
mod util;

pub use anyhow::{Context, Error};
use qu::ick_use::*;
use std::{path::Path, sync::Arc};

pub use crate::{
    error::MeasureError,
    measure::{Measure, MeasurePlan, PlotColumn},
    pipeline::{MeasureSummary, Outputs, Pipeline},
    range::Range,
    rate::RateScale,
    study::Study,
    table::{Cell, MeasureRow, MeasureTable},
    util::header,
};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

pub fn check_extension(path: &Path, ext: &str) -> Result<()> {
    ensure!(
        matches!(path.extension(), Some(p) if p == ext),
        "filename should end with `.{}`",
        ext
    );
    Ok(())
}
