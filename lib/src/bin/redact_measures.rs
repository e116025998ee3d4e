//! Write redacted copies of the measure tables, without drawing anything.
use clap::Parser;
use pulse_ox_measures::{cli::StudyOpt, header, MeasureSummary, Outputs, Pipeline};
use qu::ick_use::*;

/// Write redacted copies of every measure table in a study.
#[derive(Parser, Debug)]
struct Opt {
    #[clap(flatten)]
    study: StudyOpt,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let pipeline = Pipeline::new(opt.study.load()?);
    let summaries = pipeline.run(Outputs::TABLES)?;

    header("Redacted tables");
    println!("{}", MeasureSummary::term_table(&summaries).for_terminal());
    println!(
        "written to \"{}\"",
        pipeline.study().redacted_dir.display()
    );
    Ok(())
}
