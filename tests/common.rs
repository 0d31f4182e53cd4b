/// Shared helpers: deterministic synthetic BOLD-like series and cohort
/// directory scaffolding.
use ndarray::Array2;
use std::fs;
use std::path::Path;

#[allow(unused)]
/// Deterministic pseudo-noise in [-0.5, 0.5), LCG-based so tests never
/// depend on an RNG crate or a global seed.
pub fn noise(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
        })
        .collect()
}

#[allow(unused)]
/// Synthetic multi-ROI series (time-points × ROIs): each ROI is a mildly
/// autocorrelated noise process, and ROI 0 drives ROI 1 with a one-step
/// lag so at least one direction carries real causal structure.
pub fn synthetic_series(seed: u64, n_t: usize, n_roi: usize) -> Array2<f64> {
    let mut out = Array2::zeros((n_t, n_roi));
    for r in 0..n_roi {
        let e = noise(seed + r as u64, n_t);
        for t in 1..n_t {
            out[[t, r]] = 0.4 * out[[t - 1, r]] + e[t];
        }
    }
    if n_roi >= 2 {
        for t in 1..n_t {
            out[[t, 1]] += 0.6 * out[[t - 1, 0]];
        }
    }
    out
}

#[allow(unused)]
/// Write a subject time-series file with the all-NaN sentinel first column
/// some exports carry, exercising the sentinel drop on load.
pub fn write_subject_file(dir: &Path, file_name: &str, series: &Array2<f64>) {
    let mut buf = String::new();
    for t in 0..series.nrows() {
        buf.push_str("nan");
        for c in 0..series.ncols() {
            buf.push_str(&format!("\t{}", series[[t, c]]));
        }
        buf.push('\n');
    }
    fs::write(dir.join(file_name), buf).unwrap();
}
