use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use bold_ec::{run_subject, CausalityConfig};

#[derive(Parser)]
#[command(name = "causality", about = "Per-subject Granger causality over ROI pairs")]
struct Args {
    /// Subject time-series file (time-points × ROIs, tab-delimited)
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory; per-subject results land in <output>/<subject>/
    #[arg(short, long)]
    output: PathBuf,

    /// Percent of the recording length to analyse
    #[arg(long, default_value_t = 100.0)]
    length: f64,

    /// 1-based ROIs to analyse (-1 for all)
    #[arg(long, num_args = 1.., default_values_t = [-1i64], allow_negative_numbers = true)]
    rois: Vec<i64>,

    /// Maximum tested lag; lags 1..=max-lag are tested as negative offsets
    #[arg(long, default_value_t = 10)]
    max_lag: usize,

    /// Surrogate count (surrogate-based methods only; unused by GC)
    #[arg(long, default_value_t = 100)]
    num_surrogates: usize,

    /// Also write one TSV per ROI pair under Numerical/
    #[arg(long, default_value_t = false)]
    keep_separate: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let rois = if args.rois == [-1] {
        None
    } else {
        Some(
            args.rois
                .iter()
                .map(|&r| {
                    usize::try_from(r).map_err(|_| anyhow::anyhow!("invalid ROI index {r}"))
                })
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let cfg = CausalityConfig {
        length_percent: args.length,
        rois,
        max_lag: args.max_lag,
        num_surrogates: args.num_surrogates,
        keep_separate: args.keep_separate,
    };

    let table = run_subject(&args.input, &args.output, &cfg)?;
    println!("Written → {}", table.display());
    Ok(())
}
