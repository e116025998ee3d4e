//! Time-series charts of measure tables.
//!
//! A [`Chart`] is built from a table first, so what will be drawn (how many lines, what the legend
//! says) can be checked without rendering. [`Chart::save`] then draws it to a PNG with the
//! [`plotters`] bitmap backend. Every save starts from a fresh drawing area, so charts never
//! bleed into each other.
use crate::{
    error::MeasureError,
    measure::{MeasurePlan, PlotColumn},
    table::{MeasureRow, MeasureTable},
    util, ArcStr,
};
use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during plot generation
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Failed to save plot to file: {0}")]
    FileSave(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

type Result<T> = core::result::Result<T, PlotError>;

const SIZE: (u32, u32) = (1200, 800);

/// One line on a chart. Points without a value (missing or redacted) leave a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// The group value, for grouped measures.
    pub label: Option<ArcStr>,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl Series {
    /// Runs of consecutive points that have values, with dates as day numbers.
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = vec![];
        let mut current = vec![];
        for (date, value) in &self.points {
            match value {
                Some(value) => current.push((day_number(*date), *value)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => (),
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Chart {
    /// One line per group (in the order groups first appear), or a single line if the measure
    /// isn't grouped.
    ///
    /// Fails if the table is empty or the column hasn't been calculated.
    pub fn from_table(
        table: &MeasureTable,
        column: PlotColumn,
        title: impl Into<String>,
        y_label: impl Into<String>,
    ) -> std::result::Result<Self, MeasureError> {
        if table.is_empty() {
            return Err(MeasureError::EmptyTable(table.measure().id.clone()));
        }
        if column == PlotColumn::Rate && table.rate_column().is_none() {
            return Err(MeasureError::MissingColumn("rate".into()));
        }

        let series = if table.measure().is_grouped() {
            table
                .groups()
                .into_iter()
                .map(|label| Series {
                    points: points(table.rows_in_group(&label), column),
                    label: Some(label),
                })
                .collect()
        } else {
            vec![Series {
                label: None,
                points: points(table.iter(), column),
            }]
        };

        Ok(Chart {
            title: title.into(),
            x_label: "Date".into(),
            y_label: y_label.into(),
            series,
        })
    }

    /// Build the chart a study asks for.
    pub fn for_plan(
        table: &MeasureTable,
        plan: &MeasurePlan,
    ) -> std::result::Result<Self, MeasureError> {
        Self::from_table(table, plan.plot, plan.title.clone(), plan.y_label())
    }

    /// Whether a legend is drawn. Only grouped charts get one.
    pub fn has_legend(&self) -> bool {
        self.series.iter().any(|series| series.label.is_some())
    }

    /// The legend, in drawing order.
    pub fn legend_entries(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter_map(|series| series.label.as_deref())
            .collect()
    }

    /// Draw the chart to a PNG at `path`, creating the directory if needed.
    ///
    /// The image is 1200x800 with vertical date labels. Grouped charts get a legend in the upper
    /// right corner.
    pub fn save(&self, path: &Path) -> Result<()> {
        if !matches!(path.extension(), Some(ext) if ext == "png") {
            return Err(PlotError::InvalidData(format!(
                "charts are saved as png, got \"{}\"",
                path.display()
            )));
        }
        let (x_range, y_range) = self.ranges().ok_or_else(|| {
            PlotError::InvalidData(format!("\"{}\" has no points to draw", self.title))
        })?;
        util::ensure_parent(path)?;

        let root = BitMapBackend::new(path, SIZE);
        let drawing_area = root.into_drawing_area();
        drawing_area
            .fill(&WHITE)
            .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

        let mut chart = ChartBuilder::on(&drawing_area)
            .caption(&self.title, ("sans-serif", 40))
            .margin(20)
            .x_label_area_size(130)
            .y_label_area_size(85)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .label_style(("sans-serif", 20))
            .x_label_style(
                ("sans-serif", 20)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .x_label_formatter(&|x| format_day(*x))
            .draw()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;

        for (idx, series) in self.series.iter().enumerate() {
            let style = Palette99::pick(idx).stroke_width(2);
            let mut segments = series.segments();
            // an all-gap series still gets its legend entry
            if segments.is_empty() {
                segments.push(vec![]);
            }
            for (seg_idx, segment) in segments.into_iter().enumerate() {
                let anno = chart
                    .draw_series(LineSeries::new(segment, style))
                    .map_err(|e| PlotError::Drawing(e.to_string()))?;
                if let (0, Some(label)) = (seg_idx, &series.label) {
                    anno.label(label.to_string()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], style)
                    });
                }
            }
        }

        if self.has_legend() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(&BLACK)
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
        }

        drawing_area
            .present()
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
        Ok(())
    }

    /// Axis ranges covering every point, or `None` if there is nothing to draw.
    fn ranges(&self) -> Option<(std::ops::Range<f64>, std::ops::Range<f64>)> {
        let points = self
            .series
            .iter()
            .flat_map(|series| series.segments())
            .flatten()
            .collect::<Vec<_>>();
        if points.is_empty() {
            return None;
        }
        let x_min = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
        let mut x_max = points
            .iter()
            .map(|(x, _)| *x)
            .fold(f64::NEG_INFINITY, f64::max);
        let y_min = points.iter().map(|(_, y)| *y).fold(0., f64::min);
        let mut y_max = points
            .iter()
            .map(|(_, y)| *y)
            .fold(f64::NEG_INFINITY, f64::max)
            * 1.1;

        // a single date or a flat zero line still needs a non-empty range
        if x_max <= x_min {
            x_max = x_min + 1.;
        }
        if y_max <= y_min {
            y_max = y_min + 1.;
        }
        Some((x_min..x_max, y_min..y_max))
    }
}

fn points<'a>(
    rows: impl Iterator<Item = &'a MeasureRow>,
    column: PlotColumn,
) -> Vec<(NaiveDate, Option<f64>)> {
    let mut points = rows
        .map(|row| {
            let value = match column {
                PlotColumn::Value => row.value.value(),
                PlotColumn::Rate => row.rate.value(),
                PlotColumn::Numerator => row.numerator.value().map(|n| n as f64),
            };
            (row.date, value)
        })
        .collect::<Vec<_>>();
    points.sort_by_key(|(date, _)| *date);
    points
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn format_day(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
