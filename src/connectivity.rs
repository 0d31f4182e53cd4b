//! Functional connectivity: Pearson correlation matrices.
//!
//! The lag-free counterpart of the EC pipeline: for each subject named in
//! `subjects_list.txt`, correlate every ROI column against every other and
//! persist the N×N matrix as `<subject>_fc_matrix.npy`.
use anyhow::{Context, Result};
use ndarray::Array2;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::io;

/// Pearson correlation of the columns of `ts` (time-points × ROIs).
///
/// A constant column has zero variance; its correlations are reported as 0
/// rather than NaN so downstream tensors stay finite.
pub fn correlation_matrix(ts: &Array2<f64>) -> Array2<f64> {
    let (n_t, n_roi) = ts.dim();
    let means: Vec<f64> = (0..n_roi).map(|c| ts.column(c).sum() / n_t as f64).collect();

    // Centered columns and their norms.
    let mut centered = ts.clone();
    for c in 0..n_roi {
        centered.column_mut(c).mapv_inplace(|v| v - means[c]);
    }
    let norms: Vec<f64> =
        (0..n_roi).map(|c| centered.column(c).mapv(|v| v * v).sum().sqrt()).collect();

    let mut out = Array2::<f64>::zeros((n_roi, n_roi));
    for i in 0..n_roi {
        for j in i..n_roi {
            let denom = norms[i] * norms[j];
            let r = if denom > 0.0 {
                centered.column(i).dot(&centered.column(j)) / denom
            } else {
                0.0
            };
            out[[i, j]] = r;
            out[[j, i]] = r;
        }
    }
    out
}

/// Generate one FC matrix per subject listed in
/// `<input_dir>/subjects_list.txt`, reading `<subject><extension>` and
/// writing `<output_dir>/<subject>_fc_matrix.npy`.
pub fn generate_fc(input_dir: &Path, output_dir: &Path, extension: &str) -> Result<Vec<String>> {
    let manifest = input_dir.join("subjects_list.txt");
    let listing = fs::read_to_string(&manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;
    let subjects: Vec<&str> =
        listing.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut done = Vec::with_capacity(subjects.len());
    for sub in subjects {
        let ts = io::load_time_series(&input_dir.join(format!("{sub}{extension}")))?;
        let fc = correlation_matrix(&ts);
        let out = output_dir.join(format!("{sub}_fc_matrix.npy"));
        let data: Vec<f64> = fc.iter().copied().collect();
        io::write_npy_f64(&out, fc.shape(), &data)?;
        info!(subject = %sub, rois = fc.nrows(), "functional-connectivity matrix written");
        done.push(sub.to_string());
    }
    Ok(done)
}
