//! Per-subject causality sweep.
//!
//! [`SubjectRun`] owns everything one subject's run touches: the derived
//! subject name, the resolved output directories, the configuration and the
//! accumulating long-format table. It is threaded explicitly through the
//! sweep; there is no ambient per-run state.
//!
//! Sweep order is strictly sequential: unordered ROI pairs (i, j) with
//! i < j, and inside each pair the tested lags 1..=max_lag, each scored
//! with an independent per-lag test in both directions. A failing test
//! zeroes both of the pair's score vectors and the sweep moves on; a single
//! bad pair never aborts the subject.
use anyhow::{bail, ensure, Context, Result};
use ndarray::{s, Array1, Array2};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::CausalityConfig;
use crate::granger::granger_score;
use crate::io::{self, PairScoreRow, PairTable};

/// Owned context for one subject's causality run.
pub struct SubjectRun {
    pub name: String,
    cfg: CausalityConfig,
    subject_dir: PathBuf,
    numerical_dir: PathBuf,
    rows: Vec<PairScoreRow>,
}

impl SubjectRun {
    /// Derive the subject name from `subject_file` and create the output
    /// scaffolding `<output_dir>/<subject>/{Numerical,Figures}` (idempotent;
    /// re-runs overwrite previous results in place).
    pub fn new(subject_file: &Path, output_dir: &Path, cfg: CausalityConfig) -> Result<Self> {
        let file_name = subject_file
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("bad subject file name {}", subject_file.display()))?;
        let name = io::subject_name(file_name);

        let subject_dir = output_dir.join(&name);
        let numerical_dir = subject_dir.join("Numerical");
        let figures_dir = subject_dir.join("Figures");
        fs::create_dir_all(&numerical_dir)
            .with_context(|| format!("creating {}", numerical_dir.display()))?;
        fs::create_dir_all(&figures_dir)
            .with_context(|| format!("creating {}", figures_dir.display()))?;

        Ok(Self { name, cfg, subject_dir, numerical_dir, rows: Vec::new() })
    }

    /// Sweep every unordered ROI pair of `series` (time-points × ROIs) and
    /// accumulate the long-format rows.
    pub fn process(&mut self, series: &Array2<f64>) -> Result<()> {
        let (n_t, n_roi) = series.dim();
        let limit = self.cfg.analysed_length(n_t);
        ensure!(limit > 0, "length_percent leaves no time-points to analyse");
        ensure!(self.cfg.max_lag >= 1, "max_lag must be at least 1");

        // 0-based ROI subset; the configuration speaks 1-based.
        let rois: Vec<usize> = match &self.cfg.rois {
            None => (0..n_roi).collect(),
            Some(list) => {
                let mut out = Vec::with_capacity(list.len());
                for &r in list {
                    if r == 0 || r > n_roi {
                        bail!("ROI {r} out of range 1..={n_roi}");
                    }
                    out.push(r - 1);
                }
                out
            }
        };
        let n_pairs = rois.len() * rois.len().saturating_sub(1) / 2;
        info!(subject = %self.name, rois = rois.len(), pairs = n_pairs, "starting causality sweep");

        let columns: Vec<Array1<f64>> = rois
            .iter()
            .map(|&r| series.slice(s![..limit, r]).to_owned())
            .collect();
        let reported = self.cfg.reported_lags();

        let mut pair_counter = 0usize;
        for ii in 0..rois.len() {
            for jj in ii + 1..rois.len() {
                pair_counter += 1;
                let (roi_i, roi_j) = (rois[ii] + 1, rois[jj] + 1);
                info!(subject = %self.name, pair = pair_counter, of = n_pairs, "scoring ROI pair {roi_i}-{roi_j}");

                let (fwd, bwd) = self.score_pair(&columns[ii], &columns[jj], roi_i, roi_j);

                // Tested lag L lands at reported index max_lag − L.
                let max_lag = self.cfg.max_lag;
                let fwd_rev: Vec<f64> = (0..max_lag).map(|k| fwd[max_lag - 1 - k]).collect();
                let bwd_rev: Vec<f64> = (0..max_lag).map(|k| bwd[max_lag - 1 - k]).collect();

                for k in 0..max_lag {
                    self.rows.push(PairScoreRow {
                        lag: reported[k],
                        roi_x: roi_i,
                        roi_y: roi_j,
                        symmetric: 0.0, // placeholder, see module docs of `scores`
                        directed: fwd_rev[k],
                    });
                }
                for k in 0..max_lag {
                    self.rows.push(PairScoreRow {
                        lag: reported[k],
                        roi_x: roi_j,
                        roi_y: roi_i,
                        symmetric: 0.0,
                        directed: bwd_rev[k],
                    });
                }

                if self.cfg.keep_separate {
                    let table = PairTable {
                        roi_x: roi_i,
                        roi_y: roi_j,
                        lags: reported.clone(),
                        symmetric: vec![0.0; max_lag],
                        forward: fwd_rev,
                        backward: bwd_rev,
                    };
                    let path = self
                        .numerical_dir
                        .join(format!("{}_GC_rois-{roi_i}vs{roi_j}.tsv", self.name));
                    io::write_pair_table(&path, &table, "GCS")?;
                }
            }
        }
        Ok(())
    }

    /// Score one pair in both directions across all tested lags. Any test
    /// failure zeroes both vectors for the whole pair; the failure is
    /// logged with the subject and 1-based ROI identifiers and absorbed.
    fn score_pair(
        &self,
        col_i: &Array1<f64>,
        col_j: &Array1<f64>,
        roi_i: usize,
        roi_j: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let max_lag = self.cfg.max_lag;
        let mut fwd = vec![0.0; max_lag];
        let mut bwd = vec![0.0; max_lag];
        for (t, order) in self.cfg.tested_lags().into_iter().enumerate() {
            let step = granger_score(col_i.view(), col_j.view(), order)
                .and_then(|f| granger_score(col_j.view(), col_i.view(), order).map(|b| (f, b)));
            match step {
                Ok((f, b)) => {
                    fwd[t] = f;
                    bwd[t] = b;
                }
                Err(e) => {
                    warn!(
                        subject = %self.name,
                        roi_x = roi_i,
                        roi_y = roi_j,
                        error = %e,
                        "causality test failed; pair scores zeroed"
                    );
                    return (vec![0.0; max_lag], vec![0.0; max_lag]);
                }
            }
        }
        (fwd, bwd)
    }

    /// Accumulated long-format rows, in append order.
    pub fn rows(&self) -> &[PairScoreRow] {
        &self.rows
    }

    /// Write the combined per-subject table and return its path.
    pub fn finish(self) -> Result<PathBuf> {
        let path = self.subject_dir.join(format!("{}.tsv", self.name));
        io::write_long_table(&path, &self.rows)?;
        info!(subject = %self.name, rows = self.rows.len(), table = %path.display(), "subject table written");
        Ok(path)
    }
}

/// Full per-subject pipeline: load the time series, sweep all pairs, write
/// the combined table (and per-pair tables when configured).
pub fn run_subject(
    subject_file: &Path,
    output_dir: &Path,
    cfg: &CausalityConfig,
) -> Result<PathBuf> {
    let series = io::load_time_series(subject_file)?;
    let mut run = SubjectRun::new(subject_file, output_dir, cfg.clone())?;
    info!(subject = %run.name, "participant loaded ({} × {} time series)", series.nrows(), series.ncols());
    run.process(&series)?;
    run.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
            })
            .collect()
    }

    fn synthetic_series(n_t: usize, n_roi: usize) -> Array2<f64> {
        let mut out = Array2::zeros((n_t, n_roi));
        for r in 0..n_roi {
            let e = noise(100 + r as u64, n_t);
            for t in 1..n_t {
                out[[t, r]] = 0.4 * out[[t - 1, r]] + e[t];
            }
        }
        out
    }

    fn run_dirs(cfg: CausalityConfig) -> (TempDir, SubjectRun) {
        let tmp = TempDir::new().unwrap();
        let run =
            SubjectRun::new(Path::new("/data/sub-0001_TS.txt"), tmp.path(), cfg).unwrap();
        (tmp, run)
    }

    #[test]
    fn three_rois_two_lags_yield_twelve_rows() {
        let cfg = CausalityConfig { max_lag: 2, ..CausalityConfig::default() };
        let (_tmp, mut run) = run_dirs(cfg);
        run.process(&synthetic_series(120, 3)).unwrap();
        // 3 unordered pairs × 2 lags × 2 directions.
        assert_eq!(run.rows().len(), 12);
        assert!(run.rows().iter().all(|r| r.lag == -2 || r.lag == -1));
        assert!(run.rows().iter().all(|r| r.symmetric == 0.0));
    }

    #[test]
    fn rows_carry_mirrored_roi_order() {
        let cfg = CausalityConfig { max_lag: 2, ..CausalityConfig::default() };
        let (_tmp, mut run) = run_dirs(cfg);
        run.process(&synthetic_series(120, 2)).unwrap();
        let rows = run.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!((rows[0].roi_x, rows[0].roi_y), (1, 2));
        assert_eq!((rows[2].roi_x, rows[2].roi_y), (2, 1));
        // Lag axis ascends within each direction block.
        assert_eq!(rows[0].lag, -2);
        assert_eq!(rows[1].lag, -1);
    }

    #[test]
    fn failing_pair_is_zeroed_but_rows_remain() {
        let cfg = CausalityConfig { max_lag: 2, ..CausalityConfig::default() };
        let (_tmp, mut run) = run_dirs(cfg);
        let mut series = synthetic_series(120, 3);
        series.column_mut(2).fill(1.0); // constant ROI 3: every test involving it fails
        run.process(&series).unwrap();

        assert_eq!(run.rows().len(), 12);
        let roi3: Vec<_> =
            run.rows().iter().filter(|r| r.roi_x == 3 || r.roi_y == 3).collect();
        assert_eq!(roi3.len(), 8);
        assert!(roi3.iter().all(|r| r.directed == 0.0));
        // The healthy 1-2 pair still gets real scores.
        assert!(run.rows().iter().any(|r| r.roi_x == 1 && r.roi_y == 2 && r.directed > 0.0));
    }

    #[test]
    fn keep_separate_writes_pair_tables() {
        let cfg =
            CausalityConfig { max_lag: 2, keep_separate: true, ..CausalityConfig::default() };
        let (tmp, mut run) = run_dirs(cfg);
        run.process(&synthetic_series(120, 2)).unwrap();
        let pair = tmp
            .path()
            .join("sub-0001")
            .join("Numerical")
            .join("sub-0001_GC_rois-1vs2.tsv");
        assert!(pair.exists());
        let t = io::read_pair_table(&pair, "GCS").unwrap();
        assert_eq!(t.lags, vec![-2, -1]);
    }

    #[test]
    fn roi_subset_filters_pairs() {
        let cfg = CausalityConfig {
            max_lag: 1,
            rois: Some(vec![1, 3]),
            ..CausalityConfig::default()
        };
        let (_tmp, mut run) = run_dirs(cfg);
        run.process(&synthetic_series(100, 4)).unwrap();
        assert_eq!(run.rows().len(), 2);
        assert_eq!((run.rows()[0].roi_x, run.rows()[0].roi_y), (1, 3));
    }

    #[test]
    fn out_of_range_roi_is_rejected() {
        let cfg = CausalityConfig { rois: Some(vec![5]), ..CausalityConfig::default() };
        let (_tmp, mut run) = run_dirs(cfg);
        assert!(run.process(&synthetic_series(100, 3)).is_err());
    }

    #[test]
    fn finish_writes_combined_table() {
        let cfg = CausalityConfig { max_lag: 2, ..CausalityConfig::default() };
        let (tmp, mut run) = run_dirs(cfg);
        run.process(&synthetic_series(120, 2)).unwrap();
        let path = run.finish().unwrap();
        assert_eq!(path, tmp.path().join("sub-0001").join("sub-0001.tsv"));
        assert_eq!(io::read_long_table(&path).unwrap().len(), 4);
    }
}
