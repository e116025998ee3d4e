//! Runs every measure of a study through load, redaction, rates and output.
use crate::{
    aggregate::aggregate_by_date,
    measure::MeasurePlan,
    plot::Chart,
    rate::RateScale,
    redact::redact_small_numbers,
    study::Study,
    table::MeasureTable,
    ArcStr,
};
use chrono::NaiveDate;
use qu::ick_use::*;
use std::path::PathBuf;
use term_data_table as tdt;

/// Which files a run writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Outputs {
    pub tables: bool,
    pub charts: bool,
}

impl Outputs {
    pub const ALL: Outputs = Outputs {
        tables: true,
        charts: true,
    };
    pub const TABLES: Outputs = Outputs {
        tables: true,
        charts: false,
    };
    pub const NONE: Outputs = Outputs {
        tables: false,
        charts: false,
    };
}

/// The steps applied to a freshly loaded table, in order.
///
/// Rates are calculated after redaction, so a rate is never worked out from a suppressed count.
pub fn prepare(
    table: MeasureTable,
    plan: &MeasurePlan,
    threshold: u64,
    scale: &RateScale,
) -> MeasureTable {
    let mut table = if plan.aggregate_by_date {
        aggregate_by_date(table)
    } else {
        table
    };
    table.sort_by_date();
    let table = redact_small_numbers(table, threshold);
    scale.apply(table)
}

pub struct Pipeline {
    study: Study,
}

impl Pipeline {
    pub fn new(study: Study) -> Self {
        Self { study }
    }

    pub fn study(&self) -> &Study {
        &self.study
    }

    /// Where the measures output for `plan` is read from.
    pub fn input_path(&self, plan: &MeasurePlan) -> PathBuf {
        plan.measure.path_in(&self.study.measures_dir)
    }

    /// Where the redacted table for `plan` is written.
    pub fn redacted_path(&self, plan: &MeasurePlan) -> PathBuf {
        plan.measure.path_in(&self.study.redacted_dir)
    }

    /// Where the chart for `plan` is written.
    pub fn figure_path(&self, plan: &MeasurePlan) -> PathBuf {
        self.study
            .figures_dir
            .join(format!("{}.png", plan.filename))
    }

    /// Load one measure and apply aggregation, sorting, redaction and rates.
    pub fn process(&self, plan: &MeasurePlan) -> Result<MeasureTable> {
        let path = self.input_path(plan);
        let table = if plan.aggregate_by_date {
            MeasureTable::load_counts(&plan.measure, &path)?
        } else {
            MeasureTable::load(&plan.measure, &path)?
        };
        Ok(prepare(
            table,
            plan,
            self.study.redaction_threshold,
            &self.study.rate,
        ))
    }

    /// Write the redacted table for `plan`.
    pub fn write_table(&self, plan: &MeasurePlan, table: &MeasureTable) -> Result<PathBuf> {
        let path = self.redacted_path(plan);
        table.save_csv(&path)?;
        Ok(path)
    }

    /// Draw the chart for `plan`.
    pub fn plot(&self, plan: &MeasurePlan, table: &MeasureTable) -> Result<PathBuf> {
        let path = self.figure_path(plan);
        Chart::for_plan(table, plan)?
            .save(&path)
            .with_context(|| format!("unable to draw chart \"{}\"", path.display()))?;
        Ok(path)
    }

    /// Process every measure in the study, writing the requested outputs.
    ///
    /// Stops at the first failure.
    pub fn run(&self, outputs: Outputs) -> Result<Vec<MeasureSummary>> {
        event!(
            Level::INFO,
            "running study {} ({} measures)",
            self.study.name,
            self.study.measures.len()
        );
        let mut summaries = vec![];
        for plan in &self.study.measures {
            let table = self
                .process(plan)
                .with_context(|| format!("while processing measure {}", plan.measure))?;
            if outputs.tables {
                let path = self.write_table(plan, &table)?;
                event!(Level::INFO, "wrote \"{}\"", path.display());
            }
            if outputs.charts {
                let path = self.plot(plan, &table)?;
                event!(Level::INFO, "wrote \"{}\"", path.display());
            }
            summaries.push(MeasureSummary::from_table(&table));
        }
        Ok(summaries)
    }
}

/// Headline numbers for one processed measure.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSummary {
    pub id: ArcStr,
    pub rows: usize,
    /// Distinct group values. 0 for ungrouped measures.
    pub groups: usize,
    pub redacted_rows: usize,
    pub date_span: Option<(NaiveDate, NaiveDate)>,
}

impl MeasureSummary {
    pub fn from_table(table: &MeasureTable) -> Self {
        Self {
            id: table.measure().id.clone(),
            rows: table.len(),
            groups: if table.measure().is_grouped() {
                table.groups().len()
            } else {
                0
            },
            redacted_rows: table.redacted_rows(),
            date_span: table.date_span(),
        }
    }

    /// To display in the console/terminal.
    pub fn term_table(summaries: &[MeasureSummary]) -> tdt::Table<'static> {
        let header = ["Measure", "Rows", "Groups", "Redacted rows", "From", "To"]
            .into_iter()
            .fold(tdt::Row::new(), |row, label| {
                row.with_cell(tdt::Cell::from(label))
            });
        summaries
            .iter()
            .fold(tdt::Table::new().with_row(header), |tbl, summary| {
                let (from, to) = match summary.date_span {
                    Some((from, to)) => (from.to_string(), to.to_string()),
                    None => ("-".into(), "-".into()),
                };
                tbl.with_row(
                    tdt::Row::new()
                        .with_cell(tdt::Cell::from(summary.id.to_string()))
                        .with_cell(tdt::Cell::from(summary.rows.to_string()))
                        .with_cell(tdt::Cell::from(summary.groups.to_string()))
                        .with_cell(tdt::Cell::from(summary.redacted_rows.to_string()))
                        .with_cell(tdt::Cell::from(from))
                        .with_cell(tdt::Cell::from(to)),
                )
            })
    }
}
