use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bold_ec::assemble::{assemble_cohort, AssembleOptions, Method, SourceMode};

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Gc,
    Rcc,
}

#[derive(Parser)]
#[command(
    name = "assemble-ec",
    about = "Assemble per-subject causality results into effective-connectivity tensors"
)]
struct Args {
    /// Results directory containing sub-* subject directories
    #[arg(short, long)]
    results_dir: PathBuf,

    /// Number of ROIs (tensor side length)
    #[arg(short, long)]
    num_rois: usize,

    /// Causality method that produced the results
    #[arg(short, long, value_enum, default_value_t = MethodArg::Gc)]
    method: MethodArg,

    /// Read one table per ROI pair from Numerical/ instead of the
    /// combined per-subject table
    #[arg(long, default_value_t = false)]
    separate: bool,

    /// Drop the symmetric contribution; writes <subject>_onlydirected.npy
    #[arg(long, default_value_t = false)]
    only_directed: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let opts = AssembleOptions {
        num_rois: args.num_rois,
        method: match args.method {
            MethodArg::Gc => Method::Gc,
            MethodArg::Rcc => Method::Rcc,
        },
        mode: if args.separate { SourceMode::Separate } else { SourceMode::Combined },
        only_directed: args.only_directed,
    };

    let subjects = assemble_cohort(&args.results_dir, &opts)?;
    println!("Assembled {} subjects → {}", subjects.len(), args.results_dir.display());
    Ok(())
}
