//! Rates per fixed population base.
use crate::{
    table::{Cell, MeasureTable},
    ArcStr,
};
use qu::ick_use::*;
use serde::Deserialize;

/// The population base rates are expressed against, e.g. "per 100,000".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RateScaleRaw")]
pub struct RateScale {
    scale: u64,
    column: Option<ArcStr>,
}

#[derive(Deserialize)]
struct RateScaleRaw {
    scale: u64,
    #[serde(default)]
    column: Option<ArcStr>,
}

impl TryFrom<RateScaleRaw> for RateScale {
    type Error = Error;
    fn try_from(raw: RateScaleRaw) -> Result<Self, Self::Error> {
        let mut scale = RateScale::new(raw.scale)?;
        scale.column = raw.column;
        Ok(scale)
    }
}

impl RateScale {
    pub fn new(scale: u64) -> Result<Self> {
        ensure!(scale > 0, "the rate scale must be positive");
        Ok(Self {
            scale,
            column: None,
        })
    }

    pub fn per_thousand() -> Self {
        Self {
            scale: 1_000,
            column: None,
        }
    }

    pub fn per_hundred_thousand() -> Self {
        Self {
            scale: 100_000,
            column: None,
        }
    }

    /// Use a specific name for the rate column.
    pub fn with_column(mut self, column: impl Into<ArcStr>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn scale(&self) -> u64 {
        self.scale
    }

    /// The name of the derived column.
    pub fn column(&self) -> ArcStr {
        if let Some(column) = &self.column {
            return column.clone();
        }
        match self.scale {
            1_000 => "num_per_thousand".into(),
            100_000 => "num_per_hundred_thousand".into(),
            other => format!("num_per_{}", other).into(),
        }
    }

    /// `numerator / (denominator / scale)`.
    ///
    /// Zero or undefined denominators give an undefined rate. Redacted inputs stay redacted.
    pub fn rate(&self, numerator: Cell<u64>, denominator: Cell<u64>) -> Cell<f64> {
        match (numerator, denominator) {
            (Cell::Redacted, _) | (_, Cell::Redacted) => Cell::Redacted,
            (Cell::Value(_), Cell::Value(0)) => Cell::Missing,
            (Cell::Value(num), Cell::Value(den)) => {
                Cell::Value(num as f64 / (den as f64 / self.scale as f64))
            }
            _ => Cell::Missing,
        }
    }

    /// Fill in the rate column of every row of `table`.
    pub fn apply(&self, mut table: MeasureTable) -> MeasureTable {
        for row in table.rows_mut() {
            row.rate = self.rate(row.numerator, row.denominator);
        }
        table.set_rate_column(self.column());
        table
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        measure::Measure,
        table::{
            test::{by_sex, date},
            MeasureRow,
        },
    };

    #[test]
    fn per_thousand() {
        let measure = Measure::new("pulse_ox_total", "had_pulse_ox", "population");
        let table = MeasureTable::new(
            measure,
            vec![MeasureRow::new(
                date(2020, 1, 1),
                Cell::Value(10),
                Cell::Value(1000),
            )],
        );
        let scale = RateScale::new(1000)
            .unwrap()
            .with_column("num_per_hundred_thousand");
        let table = scale.apply(table);
        assert_eq!(table[0].rate, Cell::Value(10.));
        assert_eq!(
            table.rate_column().map(|c| &**c),
            Some("num_per_hundred_thousand")
        );
    }

    #[test]
    fn formula() {
        let scale = RateScale::per_hundred_thousand();
        for (num, den) in [(1u64, 3u64), (7, 250), (0, 19), (12345, 678901)] {
            let expected = num as f64 / (den as f64 / 100_000.);
            assert_eq!(
                scale.rate(Cell::Value(num), Cell::Value(den)),
                Cell::Value(expected)
            );
        }
    }

    #[test]
    fn undefined_denominator() {
        let scale = RateScale::per_thousand();
        assert_eq!(scale.rate(Cell::Value(4), Cell::Value(0)), Cell::Missing);
        assert_eq!(scale.rate(Cell::Value(4), Cell::Missing), Cell::Missing);
        assert_eq!(scale.rate(Cell::Missing, Cell::Value(9)), Cell::Missing);
        assert_eq!(scale.rate(Cell::Redacted, Cell::Redacted), Cell::Redacted);
    }

    #[test]
    fn deterministic() {
        let rows = vec![
            MeasureRow::new(date(2020, 1, 1), Cell::Value(10), Cell::Value(300)).with_group("F"),
            MeasureRow::new(date(2020, 1, 1), Cell::Value(8), Cell::Value(0)).with_group("M"),
        ];
        let scale = RateScale::per_thousand();
        let once = scale.apply(MeasureTable::new(by_sex(), rows));
        let again = scale.apply(once.clone());
        assert_eq!(once.into_rows(), again.into_rows());
    }

    #[test]
    fn column_names() {
        assert_eq!(&*RateScale::per_thousand().column(), "num_per_thousand");
        assert_eq!(
            &*RateScale::per_hundred_thousand().column(),
            "num_per_hundred_thousand"
        );
        assert_eq!(&*RateScale::new(10).unwrap().column(), "num_per_10");
        assert!(RateScale::new(0).is_err());
    }
}
