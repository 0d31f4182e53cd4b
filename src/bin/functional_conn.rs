use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bold_ec::connectivity::generate_fc;

#[derive(Parser)]
#[command(
    name = "functional-conn",
    about = "Generate functional-connectivity (correlation) matrices"
)]
struct Args {
    /// Input directory with subject files and subjects_list.txt
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Output directory for <subject>_fc_matrix.npy files
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Extension of the subject files
    #[arg(short, long, default_value = ".tsv")]
    extension: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let subjects = generate_fc(&args.input_dir, &args.output_dir, &args.extension)?;
    println!("FC matrices for {} subjects → {}", subjects.len(), args.output_dir.display());
    Ok(())
}
