//! Effective-connectivity tensor assembly.
//!
//! Reshapes per-subject causality results into dense tensors shaped
//! (num_lags × ROIs × ROIs), where `[l, x, y]` is the directed x→y score at
//! lag `l` (plus the symmetric score unless only-directed). Entries
//! `[l, x, y]` and `[l, y, x]` are filled independently from the two
//! directions, never copied; the diagonal stays zero; NaN scores become 0
//! before storage.
//!
//! Two result layouts feed the same assembly, selected by [`SourceMode`]:
//! one table per ROI pair under `Numerical/`, or one combined long-format
//! table per subject. Every subject of a cohort must share the lag axis of
//! the first subject processed; a mismatch aborts the whole run.
use anyhow::{bail, ensure, Context, Result};
use ndarray::Array3;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::io::{self, PairScoreRow};

/// Which on-disk layout the per-subject results use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// One `Numerical/<subject>_*_rois-<x>vs<y>.tsv` table per ROI pair.
    Separate,
    /// One combined `<subject>.tsv` long-format table.
    Combined,
}

/// Causality method that produced the results; selects the score-column
/// prefix of per-pair tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Gc,
    Rcc,
}

impl Method {
    pub fn prefix(&self) -> &'static str {
        match self {
            Method::Gc => "GCS",
            Method::Rcc => "RCCS",
        }
    }
}

/// Options for a cohort assembly run.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub num_rois: usize,
    pub method: Method,
    pub mode: SourceMode,
    /// Drop the symmetric contribution; tensors are then written as
    /// `<subject>_onlydirected.npy`.
    pub only_directed: bool,
}

fn nan_to_num(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

/// Assemble a tensor from a subject's per-pair tables under `Numerical/`.
pub fn assemble_subject_separate(
    subject_dir: &Path,
    opts: &AssembleOptions,
) -> Result<(Vec<i64>, Array3<f64>)> {
    let numerical = subject_dir.join("Numerical");
    let mut paths: Vec<_> = fs::read_dir(&numerical)
        .with_context(|| format!("listing {}", numerical.display()))?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    if paths.is_empty() {
        bail!("{}: no per-pair result files", numerical.display());
    }

    let mut lags: Option<Vec<i64>> = None;
    let mut tensor = Array3::<f64>::zeros((0, 0, 0));
    for path in &paths {
        let t = io::read_pair_table(path, opts.method.prefix())?;
        ensure!(
            t.roi_x >= 1 && t.roi_x <= opts.num_rois && t.roi_y >= 1 && t.roi_y <= opts.num_rois,
            "{}: ROI pair {}-{} outside 1..={}",
            path.display(),
            t.roi_x,
            t.roi_y,
            opts.num_rois
        );
        // Self-pairs never contribute; a pair file for one is malformed and
        // would overwrite the zero diagonal.
        ensure!(
            t.roi_x != t.roi_y,
            "{}: self-pair file for ROI {}",
            path.display(),
            t.roi_x
        );
        match &lags {
            None => {
                tensor = Array3::zeros((t.lags.len(), opts.num_rois, opts.num_rois));
                lags = Some(t.lags.clone());
            }
            Some(template) => ensure!(
                *template == t.lags,
                "{}: lag axis differs from the subject's other pair files",
                path.display()
            ),
        }
        for l in 0..t.lags.len() {
            let sym = if opts.only_directed { 0.0 } else { t.symmetric[l] };
            tensor[[l, t.roi_x - 1, t.roi_y - 1]] = nan_to_num(t.forward[l] + sym);
            tensor[[l, t.roi_y - 1, t.roi_x - 1]] = nan_to_num(t.backward[l] + sym);
        }
    }
    Ok((lags.unwrap_or_default(), tensor))
}

/// Assemble a tensor from one subject's combined long-format rows. The lag
/// axis is the sorted set of distinct lags in the table.
pub fn assemble_subject_combined(
    rows: &[PairScoreRow],
    opts: &AssembleOptions,
) -> Result<(Vec<i64>, Array3<f64>)> {
    let mut lags: Vec<i64> = rows.iter().map(|r| r.lag).collect();
    lags.sort_unstable();
    lags.dedup();
    if lags.is_empty() {
        bail!("combined table has no rows");
    }

    let mut tensor = Array3::<f64>::zeros((lags.len(), opts.num_rois, opts.num_rois));
    for r in rows {
        if r.roi_x == r.roi_y {
            continue; // self-pairs never contribute
        }
        ensure!(
            r.roi_x >= 1 && r.roi_x <= opts.num_rois && r.roi_y >= 1 && r.roi_y <= opts.num_rois,
            "ROI pair {}-{} outside 1..={}",
            r.roi_x,
            r.roi_y,
            opts.num_rois
        );
        let l = lags.binary_search(&r.lag).expect("lag from own axis");
        let sym = if opts.only_directed { 0.0 } else { r.symmetric };
        tensor[[l, r.roi_x - 1, r.roi_y - 1]] = nan_to_num(r.directed + sym);
    }
    Ok((lags, tensor))
}

/// Assemble and persist tensors for every subject directory (`sub-*`) under
/// `results_dir`, plus the shared `lags.npy`.
///
/// In combined mode a subject directory without its table is silently
/// skipped. A subject whose lag axis differs from the first assembled
/// subject aborts the whole cohort run.
///
/// Returns the names of the subjects assembled.
pub fn assemble_cohort(results_dir: &Path, opts: &AssembleOptions) -> Result<Vec<String>> {
    let mut subject_dirs: Vec<_> = fs::read_dir(results_dir)
        .with_context(|| format!("listing {}", results_dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("sub-"))
        })
        .collect();
    subject_dirs.sort();

    let mut template: Option<Vec<i64>> = None;
    let mut assembled = Vec::new();
    for dir in &subject_dirs {
        let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let name = io::subject_name(dir_name);

        let (lags, tensor) = match opts.mode {
            SourceMode::Separate => assemble_subject_separate(dir, opts)?,
            SourceMode::Combined => {
                let table = dir.join(format!("{name}.tsv"));
                if !table.exists() {
                    continue; // subject without results, skipped before assembly
                }
                let rows = io::read_long_table(&table)?;
                assemble_subject_combined(&rows, opts)?
            }
        };

        match &template {
            None => template = Some(lags),
            Some(t) => ensure!(*t == lags, "lags mismatch for subject {name}"),
        }

        let file = if opts.only_directed {
            format!("{name}_onlydirected.npy")
        } else {
            format!("{name}.npy")
        };
        io::save_tensor(&dir.join(&file), &tensor)?;
        info!(subject = %name, shape = ?tensor.shape(), "effective-connectivity tensor written");
        assembled.push(name);
    }

    match template {
        Some(lags) => io::write_npy_i64(&results_dir.join("lags.npy"), &lags)?,
        None => bail!("{}: no subject results to assemble", results_dir.display()),
    }
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(num_rois: usize, only_directed: bool) -> AssembleOptions {
        AssembleOptions { num_rois, method: Method::Gc, mode: SourceMode::Combined, only_directed }
    }

    fn row(lag: i64, x: usize, y: usize, sym: f64, gcs: f64) -> PairScoreRow {
        PairScoreRow { lag, roi_x: x, roi_y: y, symmetric: sym, directed: gcs }
    }

    #[test]
    fn combined_fills_both_directions_independently() {
        let rows = vec![
            row(-2, 1, 2, 0.0, 0.3),
            row(-1, 1, 2, 0.0, 0.4),
            row(-2, 2, 1, 0.0, 0.7),
            row(-1, 2, 1, 0.0, 0.8),
        ];
        let (lags, t) = assemble_subject_combined(&rows, &opts(3, false)).unwrap();
        assert_eq!(lags, vec![-2, -1]);
        assert_eq!(t.shape(), &[2, 3, 3]);
        assert_eq!(t[[0, 0, 1]], 0.3);
        assert_eq!(t[[1, 0, 1]], 0.4);
        assert_eq!(t[[0, 1, 0]], 0.7);
        assert_eq!(t[[1, 1, 0]], 0.8);
        // Untouched pair and the diagonal stay zero.
        assert_eq!(t[[0, 0, 2]], 0.0);
        for l in 0..2 {
            for x in 0..3 {
                assert_eq!(t[[l, x, x]], 0.0);
            }
        }
    }

    #[test]
    fn combined_replaces_nan_with_zero() {
        let rows = vec![row(-1, 1, 2, f64::NAN, f64::NAN)];
        let (_lags, t) = assemble_subject_combined(&rows, &opts(2, false)).unwrap();
        assert!(t.iter().all(|v| v.is_finite()));
        assert_eq!(t[[0, 0, 1]], 0.0);
    }

    #[test]
    fn only_directed_drops_symmetric_contribution() {
        let rows = vec![row(-1, 1, 2, 0.25, 0.5)];
        let (_l, with_sym) = assemble_subject_combined(&rows, &opts(2, false)).unwrap();
        let (_l, directed) = assemble_subject_combined(&rows, &opts(2, true)).unwrap();
        assert_eq!(with_sym[[0, 0, 1]], 0.75);
        assert_eq!(directed[[0, 0, 1]], 0.5);
    }

    #[test]
    fn combined_rejects_out_of_range_roi() {
        let rows = vec![row(-1, 1, 5, 0.0, 0.5)];
        assert!(assemble_subject_combined(&rows, &opts(3, false)).is_err());
    }

    #[test]
    fn separate_mode_rejects_self_pair_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let numerical = tmp.path().join("Numerical");
        std::fs::create_dir(&numerical).unwrap();
        let table = io::PairTable {
            roi_x: 2,
            roi_y: 2,
            lags: vec![-1],
            symmetric: vec![0.0],
            forward: vec![0.9],
            backward: vec![0.1],
        };
        io::write_pair_table(&numerical.join("sub-0001_GC_rois-2vs2.tsv"), &table, "GCS")
            .unwrap();

        let opts = AssembleOptions {
            num_rois: 3,
            method: Method::Gc,
            mode: SourceMode::Separate,
            only_directed: false,
        };
        let err = assemble_subject_separate(tmp.path(), &opts).unwrap_err();
        assert!(err.to_string().contains("self-pair"), "{err}");
    }

    #[test]
    fn self_pair_rows_are_ignored() {
        let rows = vec![row(-1, 2, 2, 0.0, 0.9), row(-1, 1, 2, 0.0, 0.5)];
        let (_l, t) = assemble_subject_combined(&rows, &opts(2, false)).unwrap();
        assert_eq!(t[[0, 1, 1]], 0.0);
    }
}
