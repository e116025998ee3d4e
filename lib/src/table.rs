//! Typed measure tables.
//!
//! The measures engine writes one CSV per measure with a `date` column, the numerator and
//! denominator columns named in the measure, any `group_by` columns and a `value` ratio. We check
//! the header and parse every row once, so the rest of the pipeline works with plain structs.
use crate::{
    error::MeasureError,
    measure::Measure,
    util::{self, parse_count, parse_date, parse_ratio},
    ArcStr,
};
use chrono::NaiveDate;
use itertools::Itertools;
use qu::ick_use::*;
use std::{fmt, fs, io, ops::Deref, path::Path};
use term_data_table as tdt;

pub const DATE_COLUMN: &str = "date";
pub const VALUE_COLUMN: &str = "value";

/// A single number in a measure table.
///
/// `Redacted` is kept separate from `Missing` so suppressed counts can be reported as such, and
/// neither is ever treated as zero.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Cell<T> {
    Value(T),
    Missing,
    Redacted,
}

impl<T> Cell<T> {
    pub fn as_ref(&self) -> Cell<&T> {
        match self {
            Cell::Value(v) => Cell::Value(v),
            Cell::Missing => Cell::Missing,
            Cell::Redacted => Cell::Redacted,
        }
    }

    /// The value, if there is one.
    pub fn value(self) -> Option<T> {
        match self {
            Cell::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, Cell::Redacted)
    }

}

impl<T> From<Option<T>> for Cell<T> {
    fn from(from: Option<T>) -> Self {
        match from {
            Some(v) => Cell::Value(v),
            None => Cell::Missing,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Value(v) => fmt::Display::fmt(v, f),
            Cell::Missing => f.write_str("missing"),
            Cell::Redacted => f.write_str("redacted"),
        }
    }
}

impl<T: ToString> Cell<T> {
    /// How the cell is written back out to CSV. Anything without a value becomes an empty field.
    fn to_field(&self) -> String {
        match self {
            Cell::Value(v) => v.to_string(),
            Cell::Missing | Cell::Redacted => String::new(),
        }
    }
}

/// `numerator / denominator`, undefined if either is undefined or the denominator is 0.
pub fn ratio(numerator: Cell<u64>, denominator: Cell<u64>) -> Cell<f64> {
    match (numerator, denominator) {
        (Cell::Redacted, _) | (_, Cell::Redacted) => Cell::Redacted,
        (Cell::Value(_), Cell::Value(0)) => Cell::Missing,
        (Cell::Value(num), Cell::Value(den)) => Cell::Value(num as f64 / den as f64),
        _ => Cell::Missing,
    }
}

/// A row in a measure table.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureRow {
    pub date: NaiveDate,
    /// Values of the `group_by` columns, in the same order. Empty for ungrouped measures.
    pub group: Vec<ArcStr>,
    pub numerator: Cell<u64>,
    pub denominator: Cell<u64>,
    pub value: Cell<f64>,
    /// `Missing` until rates have been calculated.
    pub rate: Cell<f64>,
}

impl MeasureRow {
    /// A row with the ratio calculated from the counts.
    pub fn new(date: NaiveDate, numerator: Cell<u64>, denominator: Cell<u64>) -> Self {
        Self {
            date,
            group: vec![],
            numerator,
            denominator,
            value: ratio(numerator, denominator),
            rate: Cell::Missing,
        }
    }

    pub fn with_group(mut self, value: impl Into<ArcStr>) -> Self {
        self.group.push(value.into());
        self
    }

    /// The label used for this row's group in charts and summaries.
    pub fn group_label(&self) -> ArcStr {
        match &self.group[..] {
            [] => ArcStr::from(""),
            [single] => single.clone(),
            many => many.join(", ").into(),
        }
    }

    /// Whether the disclosure control pass suppressed this row.
    pub fn is_redacted(&self) -> bool {
        self.numerator.is_redacted() || self.denominator.is_redacted()
    }
}

/// The parsed rows of one measure.
#[derive(Debug, Clone)]
pub struct MeasureTable {
    measure: Measure,
    /// Set once rates have been calculated.
    rate_column: Option<ArcStr>,
    rows: Vec<MeasureRow>,
}

impl MeasureTable {
    pub fn new(measure: Measure, rows: Vec<MeasureRow>) -> Self {
        Self {
            measure,
            rate_column: None,
            rows,
        }
    }

    /// Load the measures output for `measure`, requiring the `value` column.
    pub fn load(measure: &Measure, path: impl AsRef<Path>) -> Result<Self> {
        Self::load_inner(measure, path.as_ref(), true)
    }

    /// Load the measures output for `measure` without requiring the `value` column, for tables
    /// whose ratio will be recomputed.
    pub fn load_counts(measure: &Measure, path: impl AsRef<Path>) -> Result<Self> {
        Self::load_inner(measure, path.as_ref(), false)
    }

    fn load_inner(measure: &Measure, path: &Path, need_value: bool) -> Result<Self> {
        fn inner(measure: &Measure, path: &Path, need_value: bool) -> Result<MeasureTable> {
            let reader = io::BufReader::new(fs::File::open(path)?);
            MeasureTable::from_reader(measure, reader, need_value)
        }
        let table = inner(measure, path, need_value)
            .with_context(|| format!("while loading \"{}\"", path.display()))?;
        event!(
            Level::DEBUG,
            "loaded {} rows for measure {} from \"{}\"",
            table.len(),
            measure.id,
            path.display()
        );
        Ok(table)
    }

    /// Parse a measure table from CSV.
    ///
    /// Fails on the first missing column or unparseable cell.
    pub fn from_reader(measure: &Measure, reader: impl io::Read, need_value: bool) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| MeasureError::MissingColumn(name.into()))
        };

        let date_idx = find(DATE_COLUMN)?;
        let numerator_idx = find(&*measure.numerator)?;
        let denominator_idx = find(&*measure.denominator)?;
        let group_idxs = measure
            .group_by
            .iter()
            .map(|column| find(&**column))
            .collect::<Result<Vec<_>, _>>()?;
        let value_idx = if need_value {
            Some(find(VALUE_COLUMN)?)
        } else {
            None
        };

        let mut rows = vec![];
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |pos| pos.line());
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let invalid = |column: &str, value: &str| MeasureError::InvalidCell {
                column: column.into(),
                value: value.to_owned(),
                line,
            };

            let date = parse_date(field(date_idx))
                .ok_or_else(|| invalid(DATE_COLUMN, field(date_idx)))?;
            let numerator = parse_count(field(numerator_idx))
                .map_err(|_| invalid(&*measure.numerator, field(numerator_idx)))?
                .into();
            let denominator = parse_count(field(denominator_idx))
                .map_err(|_| invalid(&*measure.denominator, field(denominator_idx)))?
                .into();
            let value = match value_idx {
                Some(idx) => parse_ratio(field(idx))
                    .map_err(|_| invalid(VALUE_COLUMN, field(idx)))?
                    .into(),
                None => ratio(numerator, denominator),
            };
            rows.push(MeasureRow {
                date,
                group: group_idxs.iter().map(|idx| field(*idx).into()).collect(),
                numerator,
                denominator,
                value,
                rate: Cell::Missing,
            });
        }
        Ok(Self::new(measure.clone(), rows))
    }

    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    pub fn rate_column(&self) -> Option<&ArcStr> {
        self.rate_column.as_ref()
    }

    pub(crate) fn set_rate_column(&mut self, name: ArcStr) {
        self.rate_column = Some(name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeasureRow> + '_ {
        self.rows.iter()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [MeasureRow] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<MeasureRow> {
        self.rows
    }

    /// Sort chronologically. Rows with the same date keep their relative order.
    pub fn sort_by_date(&mut self) {
        self.rows.sort_by_key(|row| row.date);
    }

    /// Distinct group labels, in the order they first appear.
    pub fn groups(&self) -> Vec<ArcStr> {
        self.rows.iter().map(MeasureRow::group_label).unique().collect()
    }

    /// All rows belonging to the group with label `label`.
    pub fn rows_in_group<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a MeasureRow> {
        self.rows
            .iter()
            .filter(move |row| &*row.group_label() == label)
    }

    /// Number of rows hidden by small-number redaction.
    pub fn redacted_rows(&self) -> usize {
        self.rows.iter().filter(|row| row.is_redacted()).count()
    }

    /// The earliest and latest dates in the table.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.iter().map(|row| row.date).min()?;
        let last = self.rows.iter().map(|row| row.date).max()?;
        Some((first, last))
    }

    /// Column names, in the order they are written to CSV.
    pub fn columns(&self) -> Vec<ArcStr> {
        let mut columns = vec![ArcStr::from(DATE_COLUMN)];
        columns.extend(self.measure.group_by.iter().cloned());
        columns.push(self.measure.numerator.clone());
        columns.push(self.measure.denominator.clone());
        columns.push(VALUE_COLUMN.into());
        columns.extend(self.rate_column.iter().cloned());
        columns
    }

    /// Write the table as CSV. Missing and redacted cells are written as empty fields.
    pub fn write_csv(&self, writer: impl io::Write) -> Result {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns().iter().map(|col| col.as_bytes()))?;
        for row in &self.rows {
            let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
            record.extend(row.group.iter().map(|g| g.to_string()));
            record.push(row.numerator.to_field());
            record.push(row.denominator.to_field());
            record.push(row.value.to_field());
            if self.rate_column.is_some() {
                record.push(row.rate.to_field());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Save the table as CSV, creating the parent directory if needed.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result {
        fn inner(table: &MeasureTable, path: &Path) -> Result {
            util::ensure_parent(path).context("could not create parent")?;
            if util::path_exists(path)? {
                event!(
                    Level::WARN,
                    "overwriting existing file at \"{}\"",
                    path.display()
                );
            }
            table.write_csv(io::BufWriter::new(fs::File::create(path)?))
        }
        let path = path.as_ref();
        crate::check_extension(path, "csv")?;
        inner(self, path).with_context(|| format!("unable to save data to \"{}\"", path.display()))
    }

    /// To display in the console/terminal. Shows at most `limit` rows.
    pub fn term_table(&self, limit: usize) -> tdt::Table<'static> {
        let header = self
            .columns()
            .iter()
            .fold(tdt::Row::new(), |row, col| {
                row.with_cell(tdt::Cell::from(col.to_string()))
            });
        self.rows
            .iter()
            .take(limit)
            .fold(tdt::Table::new().with_row(header), |tbl, row| {
                let mut cells = vec![row.date.to_string()];
                cells.extend(row.group.iter().map(|g| g.to_string()));
                cells.push(row.numerator.to_string());
                cells.push(row.denominator.to_string());
                cells.push(row.value.to_string());
                if self.rate_column.is_some() {
                    cells.push(row.rate.to_string());
                }
                tbl.with_row(
                    cells
                        .into_iter()
                        .fold(tdt::Row::new(), |r, c| r.with_cell(tdt::Cell::from(c))),
                )
            })
    }
}

impl Deref for MeasureTable {
    type Target = [MeasureRow];
    fn deref(&self) -> &Self::Target {
        &self.rows
    }
}

impl<'a> IntoIterator for &'a MeasureTable {
    type IntoIter = <&'a [MeasureRow] as IntoIterator>::IntoIter;
    type Item = &'a MeasureRow;
    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn by_sex() -> Measure {
        Measure::new("pulse_ox_by_sex", "had_pulse_ox", "population").with_group_by("sex")
    }

    const BY_SEX: &str = "\
sex,had_pulse_ox,population,value,date
F,10,100,0.1,2020-02-01
M,3.0,90,0.0333,2020-02-01
F,12,110,0.109,2020-01-01
M,,95,,2020-01-01
";

    #[test]
    fn load_grouped() {
        let table = MeasureTable::from_reader(&by_sex(), BY_SEX.as_bytes(), true).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table[1].numerator, Cell::Value(3));
        assert_eq!(table[1].group_label(), ArcStr::from("M"));
        assert_eq!(table[3].numerator, Cell::Missing);
        assert_eq!(table[3].value, Cell::Missing);
        assert_eq!(table.groups(), vec![ArcStr::from("F"), ArcStr::from("M")]);
    }

    #[test]
    fn sort_is_stable() {
        let mut table = MeasureTable::from_reader(&by_sex(), BY_SEX.as_bytes(), true).unwrap();
        table.sort_by_date();
        let order = table
            .iter()
            .map(|row| (row.date, row.group_label()))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                (date(2020, 1, 1), ArcStr::from("F")),
                (date(2020, 1, 1), ArcStr::from("M")),
                (date(2020, 2, 1), ArcStr::from("F")),
                (date(2020, 2, 1), ArcStr::from("M")),
            ]
        );
        assert_eq!(table.date_span(), Some((date(2020, 1, 1), date(2020, 2, 1))));
    }

    #[test]
    fn missing_column() {
        let input = "date,had_pulse_ox,population,value\n2020-01-01,1,2,0.5\n";
        let err = MeasureTable::from_reader(&by_sex(), input.as_bytes(), true).unwrap_err();
        match err.downcast_ref::<MeasureError>() {
            Some(MeasureError::MissingColumn(col)) => assert_eq!(&**col, "sex"),
            other => panic!("expected a missing column error, got {:?}", other),
        }
    }

    #[test]
    fn value_column_only_needed_when_asked() {
        let measure = Measure::new("pulse_ox_total", "had_pulse_ox", "population");
        let input = "date,had_pulse_ox,population\n2020-01-01,1,4\n";
        assert!(MeasureTable::from_reader(&measure, input.as_bytes(), true).is_err());
        let table = MeasureTable::from_reader(&measure, input.as_bytes(), false).unwrap();
        assert_eq!(table[0].value, Cell::Value(0.25));
    }

    #[test]
    fn infinite_ratio_is_missing() {
        let measure = Measure::new("pulse_ox_total", "had_pulse_ox", "population");
        let input = "date,had_pulse_ox,population,value\n2020-01-01,4,0,inf\n";
        let table = MeasureTable::from_reader(&measure, input.as_bytes(), true).unwrap();
        assert_eq!(table[0].value, Cell::Missing);
    }

    #[test]
    fn bad_count() {
        let measure = Measure::new("pulse_ox_total", "had_pulse_ox", "population");
        let input = "date,had_pulse_ox,population,value\n2020-01-01,1.5,4,0.1\n";
        let err = MeasureTable::from_reader(&measure, input.as_bytes(), true).unwrap_err();
        match err.downcast_ref::<MeasureError>() {
            Some(MeasureError::InvalidCell { column, line, .. }) => {
                assert_eq!(&**column, "had_pulse_ox");
                assert_eq!(*line, 2);
            }
            other => panic!("expected an invalid cell error, got {:?}", other),
        }
    }

    #[test]
    fn ratio_edge_cases() {
        assert_eq!(ratio(Cell::Value(1), Cell::Value(4)), Cell::Value(0.25));
        assert_eq!(ratio(Cell::Value(1), Cell::Value(0)), Cell::Missing);
        assert_eq!(ratio(Cell::Missing, Cell::Value(4)), Cell::Missing);
        assert_eq!(ratio(Cell::Value(1), Cell::Redacted), Cell::Redacted);
    }

    #[test]
    fn csv_output() {
        let mut table = MeasureTable::new(
            by_sex(),
            vec![
                MeasureRow::new(date(2020, 1, 1), Cell::Value(1), Cell::Value(2)).with_group("F"),
                MeasureRow::new(date(2020, 1, 1), Cell::Redacted, Cell::Redacted).with_group("M"),
            ],
        );
        table.set_rate_column("num_per_thousand".into());
        table.rows_mut()[0].rate = Cell::Value(500.);
        let mut out = vec![];
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,sex,had_pulse_ox,population,value,num_per_thousand\n\
             2020-01-01,F,1,2,0.5,500\n\
             2020-01-01,M,,,,\n"
        );
    }

    #[test]
    fn save_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("redacted").join("measure_pulse_ox_by_sex.csv");
        let table = MeasureTable::from_reader(&by_sex(), BY_SEX.as_bytes(), true).unwrap();
        table.save_csv(&path).unwrap();
        table.save_csv(&path).unwrap();
        let reloaded = MeasureTable::load(&by_sex(), &path).unwrap();
        assert_eq!(reloaded.len(), table.len());
    }
}
