//! # bold-ec — effective connectivity from fMRI BOLD time series
//!
//! `bold-ec` computes pairwise directed-connectivity scores between
//! regions-of-interest (ROIs) with per-lag Granger-causality F-tests and
//! aggregates them into per-subject effective-connectivity (EC) tensors
//! for downstream graph/visualization tooling.
//!
//! ## Pipeline overview
//!
//! ```text
//! sub-XXXX_TS.txt                 time-points × ROIs, tab-delimited
//!   │
//!   ├─ io::load_time_series()     drop all-NaN sentinel column
//!   ├─ subject::SubjectRun        per pair (i<j), per lag 1..=max_lag:
//!   │     granger::granger_score  1 − p of the ssr F-test, both directions
//!   │     │
//!   │     ├─ Numerical/<sub>_GC_rois-<i>vs<j>.tsv   (--keep-separate)
//!   │     └─ <sub>.tsv            combined long-format table
//!   │
//!   └─ assemble::assemble_cohort  dense (lags × ROIs × ROIs) tensor
//!         │                       per subject + shared lags.npy,
//!         └─→ <sub>.npy           NaN→0, zero diagonal, validated lag axis
//! ```
//!
//! Functional connectivity (plain Pearson correlation, no lags) and a
//! recording splitter live in [`connectivity`] and [`split`].
//!
//! ## Quick start
//!
//! ```no_run
//! use bold_ec::{run_subject, CausalityConfig};
//! use bold_ec::assemble::{assemble_cohort, AssembleOptions, Method, SourceMode};
//! use std::path::Path;
//!
//! // 1. Score one subject: writes results/sub-0001/sub-0001.tsv
//! let cfg = CausalityConfig { max_lag: 5, ..CausalityConfig::default() };
//! run_subject(Path::new("data/sub-0001_TS.txt"), Path::new("results"), &cfg).unwrap();
//!
//! // 2. Assemble the cohort into EC tensors
//! let opts = AssembleOptions {
//!     num_rois: 90,
//!     method: Method::Gc,
//!     mode: SourceMode::Combined,
//!     only_directed: false,
//! };
//! assemble_cohort(Path::new("results"), &opts).unwrap();
//! ```

pub mod assemble;
pub mod config;
pub mod connectivity;
pub mod granger;
pub mod io;
pub mod scores;
pub mod split;
pub mod subject;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `bold_ec::Foo` without having to know the internal module layout.

// config
pub use config::CausalityConfig;

// granger
pub use granger::granger_score;

// scores
pub use scores::{confusion_matrix_scores, score_ij, unidirectional_score_ij};

// subject
pub use subject::{run_subject, SubjectRun};

// assemble
pub use assemble::{
    assemble_cohort, assemble_subject_combined, assemble_subject_separate, AssembleOptions,
    Method, SourceMode,
};

// connectivity
pub use connectivity::{correlation_matrix, generate_fc};

// split
pub use split::{split_all, survey_lengths, RecordingLength};

// io
pub use io::{
    load_time_series, load_tensor, read_long_table, read_npy_f64, read_npy_i64,
    read_pair_table, save_tensor, subject_name, write_long_table, write_npy_f64,
    write_npy_i64, write_pair_table, PairScoreRow, PairTable, LONG_TABLE_HEADER,
};
