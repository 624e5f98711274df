use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use dyns_run::run_dynamic_ns;
use serde_json::json;
use tracing::info;

use crate::config::RunFile;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML file describing the problem, sampler settings and options.
    #[arg(long)]
    pub config: PathBuf,
    /// Override the output directory from the configuration.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
    /// Override the dynamic goal from the configuration.
    #[arg(long)]
    pub goal: Option<f64>,
    /// Override the seed from the configuration.
    #[arg(long)]
    pub seed: Option<i64>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut file = RunFile::load(&args.config)?;
    if let Some(goal) = args.goal {
        file.goal = goal;
    }
    if let Some(base_dir) = &args.base_dir {
        file.settings.base_dir = base_dir.clone();
    }
    if let Some(seed) = args.seed {
        file.settings.seed = seed;
    }
    if file.auto_root {
        file.settings.file_root = file.root_name();
    }
    let mut sampler = file.problem.sampler();
    info!(
        config = %args.config.display(),
        file_root = %file.settings.file_root,
        "running dynamic nested sampling"
    );
    let dyn_info = run_dynamic_ns(&mut sampler, &file.settings, file.goal, &file.options)?;
    let summary = json!({
        "file_root": file.settings.file_root,
        "base_dir": file.settings.base_dir,
        "goal": file.goal,
        "peak_start_ind": dyn_info.allocation.peak_start_ind,
        "max_nlive": dyn_info.allocation.nlives.max_nlive(),
        "target_samples": dyn_info.target_samples,
        "resume_ndead": dyn_info.resume_ndead,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
