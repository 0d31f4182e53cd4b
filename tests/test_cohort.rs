mod common;
use common::{synthetic_series, write_subject_file};

use bold_ec::assemble::{assemble_cohort, AssembleOptions, Method, SourceMode};
use bold_ec::{io, run_subject, CausalityConfig};
use std::fs;
use tempfile::TempDir;

fn combined_opts(num_rois: usize) -> AssembleOptions {
    AssembleOptions {
        num_rois,
        method: Method::Gc,
        mode: SourceMode::Combined,
        only_directed: false,
    }
}

/// Score `names` into `results/`, one synthetic subject each.
fn build_cohort(tmp: &TempDir, names: &[&str], max_lag: usize) -> std::path::PathBuf {
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    let out = tmp.path().join("results");
    let cfg = CausalityConfig { max_lag, ..CausalityConfig::default() };
    for (k, name) in names.iter().enumerate() {
        let file = format!("{name}_TS.txt");
        write_subject_file(&data_dir, &file, &synthetic_series(10 + k as u64, 150, 3));
        run_subject(&data_dir.join(&file), &out, &cfg).unwrap();
    }
    out
}

#[test]
fn cohort_assembly_writes_tensors_and_shared_lags() {
    let tmp = TempDir::new().unwrap();
    let out = build_cohort(&tmp, &["sub-0001", "sub-0002"], 2);

    let subjects = assemble_cohort(&out, &combined_opts(3)).unwrap();
    assert_eq!(subjects, vec!["sub-0001", "sub-0002"]);

    for name in &subjects {
        let tensor = io::load_tensor(&out.join(name).join(format!("{name}.npy"))).unwrap();
        assert_eq!(tensor.shape(), &[2, 3, 3]);
        assert!(tensor.iter().all(|v| v.is_finite()));
    }
    assert_eq!(io::read_npy_i64(&out.join("lags.npy")).unwrap(), vec![-2, -1]);
}

#[test]
fn lag_mismatch_aborts_and_names_the_subject() {
    let tmp = TempDir::new().unwrap();
    let out = build_cohort(&tmp, &["sub-0001", "sub-0002"], 2);

    // Rewrite the second subject's table with a foreign lag axis.
    let table = out.join("sub-0002").join("sub-0002.tsv");
    let rows = vec![
        io::PairScoreRow { lag: -3, roi_x: 1, roi_y: 2, symmetric: 0.0, directed: 0.5 },
        io::PairScoreRow { lag: -3, roi_x: 2, roi_y: 1, symmetric: 0.0, directed: 0.5 },
    ];
    io::write_long_table(&table, &rows).unwrap();

    let err = assemble_cohort(&out, &combined_opts(3)).unwrap_err();
    assert!(err.to_string().contains("sub-0002"), "error should name the subject: {err}");
    // Hard abort: the offending subject got no tensor.
    assert!(!out.join("sub-0002").join("sub-0002.npy").exists());
}

#[test]
fn subject_without_combined_table_is_silently_skipped() {
    let tmp = TempDir::new().unwrap();
    let out = build_cohort(&tmp, &["sub-0001"], 2);
    fs::create_dir_all(out.join("sub-0099")).unwrap(); // present but resultless

    let subjects = assemble_cohort(&out, &combined_opts(3)).unwrap();
    assert_eq!(subjects, vec!["sub-0001"]);
    assert!(!out.join("sub-0099").join("sub-0099.npy").exists());
}

#[test]
fn non_subject_directories_are_ignored() {
    let tmp = TempDir::new().unwrap();
    let out = build_cohort(&tmp, &["sub-0001"], 1);
    fs::create_dir_all(out.join("figures-misc")).unwrap();

    let subjects = assemble_cohort(&out, &combined_opts(3)).unwrap();
    assert_eq!(subjects, vec!["sub-0001"]);
}

#[test]
fn only_directed_changes_the_tensor_file_name() {
    let tmp = TempDir::new().unwrap();
    let out = build_cohort(&tmp, &["sub-0001"], 1);

    let opts = AssembleOptions { only_directed: true, ..combined_opts(3) };
    assemble_cohort(&out, &opts).unwrap();
    let dir = out.join("sub-0001");
    assert!(dir.join("sub-0001_onlydirected.npy").exists());
    assert!(!dir.join("sub-0001.npy").exists());
}

#[test]
fn empty_results_directory_is_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(assemble_cohort(tmp.path(), &combined_opts(3)).is_err());
}

#[test]
fn separate_mode_cohort_round_trip() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    let out = tmp.path().join("results");
    let cfg = CausalityConfig { max_lag: 2, keep_separate: true, ..CausalityConfig::default() };
    write_subject_file(&data_dir, "sub-0001_TS.txt", &synthetic_series(20, 150, 3));
    run_subject(&data_dir.join("sub-0001_TS.txt"), &out, &cfg).unwrap();

    let opts = AssembleOptions { mode: SourceMode::Separate, ..combined_opts(3) };
    let subjects = assemble_cohort(&out, &opts).unwrap();
    assert_eq!(subjects, vec!["sub-0001"]);
    let tensor =
        io::load_tensor(&out.join("sub-0001").join("sub-0001.npy")).unwrap();
    assert_eq!(tensor.shape(), &[2, 3, 3]);
}
