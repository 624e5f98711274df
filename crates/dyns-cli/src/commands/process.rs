use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dyns_run::{estimators, process_dynamic_run};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// File root the procedure was run with.
    #[arg(long)]
    pub file_root: String,
    /// Directory holding the run outputs.
    #[arg(long, default_value = "chains")]
    pub base_dir: PathBuf,
    /// Dynamic goal the procedure was run with.
    #[arg(long)]
    pub goal: f64,
    /// Parameter indices to report posterior means for.
    #[arg(long = "param", value_name = "INDEX")]
    pub params: Vec<usize>,
}

#[derive(Debug, Serialize)]
struct ProcessReport {
    file_root: String,
    samples: usize,
    nlike: u64,
    logz: f64,
    param_means: Vec<(usize, f64)>,
    resume_ndead: Option<usize>,
    resume_nlike: Option<u64>,
}

pub fn run(args: &ProcessArgs) -> Result<(), Box<dyn Error>> {
    let processed = process_dynamic_run(&args.file_root, &args.base_dir, args.goal)?;
    let param_means = args
        .params
        .iter()
        .map(|&index| estimators::param_mean(&processed.run, index).map(|mean| (index, mean)))
        .collect::<Result<Vec<_>, _>>()?;
    let report = ProcessReport {
        file_root: args.file_root.clone(),
        samples: estimators::count_samples(&processed.run),
        nlike: processed.nlike,
        logz: estimators::logz(&processed.run),
        param_means,
        resume_ndead: processed.info.resume_ndead,
        resume_nlike: processed.info.resume_nlike,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
