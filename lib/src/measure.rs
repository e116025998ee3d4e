//! Measure declarations, mirroring the `Measure(...)` entries of the upstream study definition.
//!
//! The extraction engine turns each declaration into a CSV named `measure_<id>.csv`. We only need
//! to know the column names it used, plus how the result should be charted.
use crate::ArcStr;
use serde::Deserialize;
use std::{fmt, path::Path, path::PathBuf};

/// A named ratio, optionally broken down by one or more categorical columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Measure {
    pub id: ArcStr,
    pub numerator: ArcStr,
    pub denominator: ArcStr,
    #[serde(default)]
    pub group_by: Vec<ArcStr>,
}

impl Measure {
    pub fn new(
        id: impl Into<ArcStr>,
        numerator: impl Into<ArcStr>,
        denominator: impl Into<ArcStr>,
    ) -> Self {
        Self {
            id: id.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            group_by: vec![],
        }
    }

    pub fn with_group_by(mut self, column: impl Into<ArcStr>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// The file the extraction engine writes this measure to.
    pub fn file_name(&self) -> String {
        format!("measure_{}.csv", self.id)
    }

    /// Where to find this measure inside `dir`.
    ///
    /// Note: No protection from escaping the root directory.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} / {}", self.id, self.numerator, self.denominator)?;
        if self.is_grouped() {
            write!(f, " by {}", self.group_by.join(", "))?;
        }
        f.write_str(")")
    }
}

/// Which column of a measure table ends up on the y axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotColumn {
    /// The ratio supplied by (or recomputed from) the measures output.
    Value,
    /// The rate per fixed population base.
    Rate,
    /// The raw numerator count.
    Numerator,
}

impl PlotColumn {
    /// The y axis label used when the study doesn't give one.
    pub fn default_label(self) -> &'static str {
        match self {
            PlotColumn::Value => "% of population",
            PlotColumn::Rate => "Rate per population",
            PlotColumn::Numerator => "Total Number",
        }
    }
}

/// A measure together with what to do with it once it is loaded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeasurePlan {
    #[serde(flatten)]
    pub measure: Measure,
    /// Chart title.
    pub title: String,
    /// File stem for the chart.
    pub filename: String,
    #[serde(default = "default_plot")]
    pub plot: PlotColumn,
    #[serde(default)]
    pub y_label: Option<String>,
    /// Re-derive the table by summing rows per date, ignoring the supplied ratio.
    ///
    /// The measures engine has produced unusable totals for the ungrouped case before, this is
    /// the workaround.
    #[serde(default)]
    pub aggregate_by_date: bool,
}

fn default_plot() -> PlotColumn {
    PlotColumn::Value
}

impl MeasurePlan {
    pub fn y_label(&self) -> &str {
        self.y_label
            .as_deref()
            .unwrap_or_else(|| self.plot.default_label())
    }
}
