//! Command line options shared by the binaries.
use crate::Study;
use clap::Args;
use qu::ick_use::*;
use std::path::PathBuf;

/// Which study to run, and overrides for its settings.
#[derive(Args, Debug, Default)]
pub struct StudyOpt {
    /// Study file (`.toml`). Defaults to the built-in pulse oximetry study.
    #[clap(long, short)]
    pub study: Option<PathBuf>,
    /// Directory containing the `measure_<id>.csv` files.
    #[clap(long)]
    pub measures_dir: Option<PathBuf>,
    /// Directory charts are written to.
    #[clap(long)]
    pub figures_dir: Option<PathBuf>,
    /// Directory redacted tables are written to.
    #[clap(long)]
    pub redacted_dir: Option<PathBuf>,
    /// Counts at or below this are suppressed.
    #[clap(long, short)]
    pub threshold: Option<u64>,
}

impl StudyOpt {
    /// Load the study and apply any overrides.
    pub fn load(self) -> Result<Study> {
        let mut study = match &self.study {
            Some(path) => Study::load(path)?,
            None => Study::pulse_ox()?,
        };
        if let Some(dir) = self.measures_dir {
            study.measures_dir = dir;
        }
        if let Some(dir) = self.figures_dir {
            study.figures_dir = dir;
        }
        if let Some(dir) = self.redacted_dir {
            study.redacted_dir = dir;
        }
        if let Some(threshold) = self.threshold {
            study.redaction_threshold = threshold;
        }
        event!(
            Level::INFO,
            "study {}: reading from \"{}\", suppressing counts <= {}",
            study.name,
            study.measures_dir.display(),
            study.redaction_threshold
        );
        Ok(study)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    #[test]
    fn overrides() {
        let opt = StudyOpt {
            measures_dir: Some("elsewhere".into()),
            threshold: Some(7),
            ..StudyOpt::default()
        };
        let study = opt.load().unwrap();
        assert_eq!(study.name, "pulse_ox");
        assert_eq!(study.measures_dir, Path::new("elsewhere"));
        assert_eq!(study.figures_dir, Path::new("output/figures"));
        assert_eq!(study.redaction_threshold, 7);
    }
}
