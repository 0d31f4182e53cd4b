mod common;
use common::{synthetic_series, write_subject_file};

use approx::assert_abs_diff_eq;
use bold_ec::connectivity::generate_fc;
use bold_ec::io::read_npy_f64;
use std::fs;
use tempfile::TempDir;

#[test]
fn manifest_driven_fc_generation() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    fs::create_dir(&input).unwrap();

    write_subject_file(&input, "sub-0001.tsv", &synthetic_series(1, 80, 4));
    write_subject_file(&input, "sub-0002.tsv", &synthetic_series(2, 80, 4));
    write_subject_file(&input, "sub-0003.tsv", &synthetic_series(3, 80, 4)); // not listed
    fs::write(input.join("subjects_list.txt"), "sub-0001\nsub-0002\n").unwrap();

    let output = tmp.path().join("fc");
    let subjects = generate_fc(&input, &output, ".tsv").unwrap();
    assert_eq!(subjects, vec!["sub-0001", "sub-0002"]);
    assert!(!output.join("sub-0003_fc_matrix.npy").exists());

    let (shape, data) = read_npy_f64(&output.join("sub-0001_fc_matrix.npy")).unwrap();
    assert_eq!(shape, vec![4, 4]);
    // Unit diagonal, symmetric, values within [-1, 1].
    for i in 0..4 {
        assert_abs_diff_eq!(data[i * 4 + i], 1.0, epsilon = 1e-12);
        for j in 0..4 {
            assert_abs_diff_eq!(data[i * 4 + j], data[j * 4 + i], epsilon = 1e-12);
            assert!(data[i * 4 + j].abs() <= 1.0 + 1e-12);
        }
    }
}

#[test]
fn missing_manifest_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("input");
    fs::create_dir(&input).unwrap();
    assert!(generate_fc(&input, &tmp.path().join("fc"), ".tsv").is_err());
}
