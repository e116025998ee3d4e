//! Print what each measure looks like after redaction, without writing any files.
use clap::Parser;
use pulse_ox_measures::{cli::StudyOpt, header, MeasureSummary, Pipeline};
use qu::ick_use::*;

/// Summarise every measure in a study after redaction, without writing files.
#[derive(Parser, Debug)]
struct Opt {
    #[clap(flatten)]
    study: StudyOpt,
    /// Also print the first `ROWS` rows of each table.
    #[clap(long, short)]
    rows: Option<usize>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let pipeline = Pipeline::new(opt.study.load()?);
    let mut summaries = vec![];
    for plan in &pipeline.study().measures {
        let table = pipeline
            .process(plan)
            .with_context(|| format!("while processing measure {}", plan.measure))?;
        if let Some(rows) = opt.rows {
            header(&plan.title);
            println!("{}", table.term_table(rows).for_terminal());
        }
        summaries.push(MeasureSummary::from_table(&table));
    }

    header("Summary");
    println!("{}", MeasureSummary::term_table(&summaries).for_terminal());
    Ok(())
}
