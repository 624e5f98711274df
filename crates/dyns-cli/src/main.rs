use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    process::{self, ProcessArgs},
    run::{self, RunArgs},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser, Debug)]
#[command(name = "dyns", about = "Dynamic nested sampling CLI")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run dynamic nested sampling with the reference sampler.
    Run(RunArgs),
    /// Merge the runs of a finished procedure and print estimators.
    Process(ProcessArgs),
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "info" });
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Process(args) => process::run(&args),
    }
}
