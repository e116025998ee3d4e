//! Redact every measure in the study, then write the redacted tables and draw the charts.
use clap::Parser;
use pulse_ox_measures::{cli::StudyOpt, header, MeasureSummary, Outputs, Pipeline};
use qu::ick_use::*;

/// Write redacted tables and draw a chart for every measure in a study.
#[derive(Parser, Debug)]
struct Opt {
    #[clap(flatten)]
    study: StudyOpt,
    /// Only write the redacted tables.
    #[clap(long)]
    no_charts: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let outputs = if opt.no_charts {
        Outputs::TABLES
    } else {
        Outputs::ALL
    };
    let pipeline = Pipeline::new(opt.study.load()?);
    let summaries = pipeline.run(outputs)?;

    header(&format!("Study {}", pipeline.study().name));
    println!("{}", MeasureSummary::term_table(&summaries).for_terminal());
    Ok(())
}
