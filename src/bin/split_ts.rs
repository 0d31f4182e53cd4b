use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bold_ec::split::{split_all, survey_lengths, RecordingLength};

#[derive(Parser)]
#[command(
    name = "split-ts",
    about = "Survey recording lengths and split long recordings into segments"
)]
struct Args {
    /// Directory holding the source .tsv recordings
    #[arg(short, long)]
    source_dir: PathBuf,

    /// Destination for the split segments; must not exist yet.
    /// When omitted, only the length survey is printed.
    #[arg(short, long)]
    destination_dir: Option<PathBuf>,

    /// Minimum segment length in time-points
    #[arg(short = 'l', long, default_value_t = 200)]
    min_length: usize,
}

fn print_survey(title: &str, survey: &[RecordingLength]) {
    println!("{title}");
    println!("{:<28} {:<12} {:>8}  cohort", "file", "subject", "length");
    for r in survey {
        println!(
            "{:<28} {:<12} {:>8}  {}",
            r.file_name,
            r.subject,
            r.length,
            if r.pathological { "PAT" } else { "CON" }
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let survey = survey_lengths(&args.source_dir)?;
    print_survey("Source recordings (longest first):", &survey);

    if let Some(dest) = &args.destination_dir {
        let after = split_all(&args.source_dir, dest, args.min_length)?;
        println!();
        print_survey("Split segments:", &after);
    }
    Ok(())
}
