//! Directional score combination and network scoring.
//!
//! Pure, stateless helpers vectorized over the lag axis. `p_*` arguments
//! are p-values in [0, 1]; outputs are confidence-style scores in [0, 1].
use ndarray::Array1;

/// Delta-weighted symmetric-product score:
/// `(1 − p_i2j) · (1 − p_j2i) · p_delta`, element-wise over lags.
pub fn score_ij(p_i2j: &Array1<f64>, p_j2i: &Array1<f64>, p_delta: &Array1<f64>) -> Array1<f64> {
    (1.0 - p_i2j) * (1.0 - p_j2i) * p_delta
}

/// Lag-sign-branching directional scores.
///
/// Negative lags weight the backward evidence by `(1 − p_delta_neg)`,
/// positive lags weight the forward evidence by `(1 − p_delta_pos)`; the
/// reverse direction mirrors the branches. Zero lags score zero in both
/// directions.
pub fn unidirectional_score_ij(
    p_i2j: &Array1<f64>,
    p_j2i: &Array1<f64>,
    p_delta_pos: &Array1<f64>,
    p_delta_neg: &Array1<f64>,
    lags: &[i64],
) -> (Array1<f64>, Array1<f64>) {
    let n = lags.len();
    let mut x2y = Array1::zeros(n);
    let mut y2x = Array1::zeros(n);
    for k in 0..n {
        let backward = (1.0 - p_delta_neg[k]) * (1.0 - p_j2i[k]);
        let forward = (1.0 - p_delta_pos[k]) * (1.0 - p_i2j[k]);
        if lags[k] < 0 {
            x2y[k] = backward;
            y2x[k] = forward;
        } else if lags[k] > 0 {
            x2y[k] = forward;
            y2x[k] = backward;
        }
    }
    (x2y, y2x)
}

/// Confusion-matrix metrics over the off-diagonal entries of two binary
/// N×N networks (upper triangle flattened first, then lower, matching the
/// directed-edge layout of the EC tensors).
///
/// Returns `(sensitivity, specificity, positive predictive value)`; each
/// metric is 0 when its denominator is 0.
pub fn confusion_matrix_scores(
    gt: &ndarray::Array2<f64>,
    pred: &ndarray::Array2<f64>,
) -> (f64, f64, f64) {
    debug_assert_eq!(gt.dim(), pred.dim());
    let n = gt.nrows();

    let (mut tn, mut fp, mut fnn, mut tp) = (0u64, 0u64, 0u64, 0u64);
    let count = |i: usize, j: usize, tn: &mut u64, fp: &mut u64, fnn: &mut u64, tp: &mut u64| {
        let g = gt[[i, j]] != 0.0;
        let p = pred[[i, j]] != 0.0;
        match (g, p) {
            (false, false) => *tn += 1,
            (false, true) => *fp += 1,
            (true, false) => *fnn += 1,
            (true, true) => *tp += 1,
        }
    };
    for i in 0..n {
        for j in i + 1..n {
            count(i, j, &mut tn, &mut fp, &mut fnn, &mut tp);
        }
    }
    for i in 0..n {
        for j in 0..i {
            count(i, j, &mut tn, &mut fp, &mut fnn, &mut tp);
        }
    }

    let ratio = |num: u64, den: u64| if den > 0 { num as f64 / den as f64 } else { 0.0 };
    (
        ratio(tp, tp + fnn),
        ratio(tn, tn + fp),
        ratio(tp, tp + fp),
    )
}
