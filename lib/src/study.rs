//! Study configuration: where the measures are, how to redact them and what to draw.
use crate::{
    measure::MeasurePlan,
    rate::RateScale,
    redact::DEFAULT_THRESHOLD,
};
use qu::ick_use::*;
use serde::Deserialize;
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

/// The pulse oximetry study, built into the binaries.
const PULSE_OX: &str = include_str!("../../data/studies/pulse_ox.toml");

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Study {
    pub name: String,
    /// Directory containing the `measure_<id>.csv` files.
    pub measures_dir: PathBuf,
    /// Charts are written here.
    pub figures_dir: PathBuf,
    /// Redacted tables are written here.
    pub redacted_dir: PathBuf,
    #[serde(default = "default_threshold")]
    pub redaction_threshold: u64,
    pub rate: RateScale,
    pub measures: Vec<MeasurePlan>,
}

fn default_threshold() -> u64 {
    DEFAULT_THRESHOLD
}

impl Study {
    /// The study this repository was written for.
    pub fn pulse_ox() -> Result<Self> {
        Self::from_toml(PULSE_OX).context("in the built-in pulse oximetry study")
    }

    /// Load a study from a `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Study> {
            let input = fs::read_to_string(path)?;
            Study::from_toml(&input)
        }
        let path = path.as_ref();
        crate::check_extension(path, "toml")?;
        inner(path).with_context(|| format!("unable to load study from \"{}\"", path.display()))
    }

    pub fn from_toml(input: &str) -> Result<Self> {
        let study: Study = toml::from_str(input)?;
        study.validate()?;
        Ok(study)
    }

    /// Checks that can't be expressed in the types.
    pub fn validate(&self) -> Result {
        ensure!(!self.measures.is_empty(), "study \"{}\" has no measures", self.name);
        let mut ids = BTreeSet::new();
        let mut filenames = BTreeSet::new();
        for plan in &self.measures {
            let id = &plan.measure.id;
            ensure!(!id.is_empty(), "measure ids cannot be empty");
            ensure!(ids.insert(id.clone()), "measure \"{}\" is declared twice", id);
            ensure!(
                !plan.filename.trim().is_empty(),
                "measure \"{}\" has no chart filename",
                id
            );
            ensure!(
                filenames.insert(plan.filename.clone()),
                "chart filename \"{}\" is used by more than one measure",
                plan.filename
            );
            ensure!(
                !plan.aggregate_by_date || !plan.measure.is_grouped(),
                "measure \"{}\" is grouped, so it can't be re-aggregated by date",
                id
            );
        }
        Ok(())
    }

    /// Find a measure by its id.
    pub fn find(&self, id: &str) -> Option<&MeasurePlan> {
        self.measures.iter().find(|plan| &*plan.measure.id == id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{measure::PlotColumn, ArcStr};

    #[test]
    fn builtin() {
        let study = Study::pulse_ox().unwrap();
        assert_eq!(study.redaction_threshold, 5);
        assert_eq!(study.rate.scale(), 100_000);
        let ids = study
            .measures
            .iter()
            .map(|plan| &*plan.measure.id)
            .collect::<Vec<_>>();
        assert_eq!(
            ids,
            [
                "pulse_ox_by_sex",
                "pulse_ox_by_region",
                "pulse_ox_by_age_band",
                "pulse_ox_total"
            ]
        );
        let total = study.find("pulse_ox_total").unwrap();
        assert!(total.aggregate_by_date);
        assert_eq!(total.plot, PlotColumn::Numerator);
        assert!(!total.measure.is_grouped());
        let by_sex = study.find("pulse_ox_by_sex").unwrap();
        assert_eq!(by_sex.measure.group_by, vec![ArcStr::from("sex")]);
    }

    #[test]
    fn shipped_studies_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/studies");
        for name in ["pulse_ox.toml", "smr.toml"] {
            Study::load(dir.join(name)).unwrap();
        }
    }

    const MINIMAL: &str = r#"
name = "test"
measures_dir = "in"
figures_dir = "out"
redacted_dir = "out/redacted"
rate = { scale = 1000 }

[[measures]]
id = "a_total"
numerator = "had_a"
denominator = "population"
title = "A"
filename = "a"
"#;

    #[test]
    fn defaults() {
        let study = Study::from_toml(MINIMAL).unwrap();
        assert_eq!(study.redaction_threshold, DEFAULT_THRESHOLD);
        let plan = &study.measures[0];
        assert_eq!(plan.plot, PlotColumn::Value);
        assert!(!plan.aggregate_by_date);
        assert!(plan.measure.group_by.is_empty());
        assert_eq!(plan.y_label(), "% of population");
    }

    #[test]
    fn rejects_bad_studies() {
        let zero_scale = MINIMAL.replace("scale = 1000", "scale = 0");
        assert!(Study::from_toml(&zero_scale).is_err());

        let duplicate = format!(
            "{}\n[[measures]]\nid = \"a_total\"\nnumerator = \"x\"\ndenominator = \"y\"\n\
             title = \"B\"\nfilename = \"b\"\n",
            MINIMAL
        );
        assert!(Study::from_toml(&duplicate).is_err());

        let grouped_aggregate = MINIMAL.replace(
            "filename = \"a\"",
            "filename = \"a\"\ngroup_by = [\"sex\"]\naggregate_by_date = true",
        );
        assert!(Study::from_toml(&grouped_aggregate).is_err());

        assert!(Study::load("study.json").is_err());
    }
}
