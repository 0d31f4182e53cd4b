//! Per-lag pairwise Granger causality test.
//!
//! Faithful to statsmodels' `grangercausalitytests` ssr F-test, called one
//! lag order at a time: with order `L` and `T` aligned samples there are
//! `n = T − L` observations; the restricted model regresses the effect on
//! its own `L` lags plus an intercept, the unrestricted model adds the
//! cause's `L` lags, and
//!
//! ```text
//! F = ((RSS_r − RSS_u) / L) / (RSS_u / (n − 2L − 1))    df = (L, n − 2L − 1)
//! ```
//!
//! The returned score is `1 − p` of that statistic, i.e. the F CDF at `F`.
//! OLS is solved through the normal equations with a dense Cholesky
//! factorisation; collinear regressors surface as an `Err` rather than a
//! silently unstable fit.
use anyhow::{bail, ensure, Context, Result};
use ndarray::ArrayView1;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Directional causality score for "`cause`'s past improves prediction of
/// `effect`'s present beyond `effect`'s own past", at model order `order`.
///
/// Returns `1 − p_value ∈ [0, 1]`. Errors on insufficient data, collinear
/// regressors, or a non-finite statistic; callers decide how to degrade.
pub fn granger_score(
    cause: ArrayView1<f64>,
    effect: ArrayView1<f64>,
    order: usize,
) -> Result<f64> {
    let t = effect.len();
    ensure!(cause.len() == t, "cause/effect length mismatch ({} vs {t})", cause.len());
    ensure!(order >= 1, "lag order must be at least 1");
    let n = t.checked_sub(order).context("series shorter than lag order")?;
    let df2 = n as i64 - 2 * order as i64 - 1;
    if df2 <= 0 {
        bail!("insufficient observations for lag order {order}: n = {n}");
    }

    // Regressor layout: [effect lags 1..=L, (cause lags 1..=L,) intercept].
    let k_r = order + 1;
    let k_u = 2 * order + 1;
    let mut x_r = Vec::with_capacity(n * k_r);
    let mut x_u = Vec::with_capacity(n * k_u);
    let mut y = Vec::with_capacity(n);
    for ti in order..t {
        y.push(effect[ti]);
        for l in 1..=order {
            x_r.push(effect[ti - l]);
            x_u.push(effect[ti - l]);
        }
        for l in 1..=order {
            x_u.push(cause[ti - l]);
        }
        x_r.push(1.0);
        x_u.push(1.0);
    }

    let rss_r = ols_rss(&x_r, n, k_r, &y)?;
    let rss_u = ols_rss(&x_u, n, k_u, &y)?;
    if rss_u <= 0.0 {
        bail!("degenerate fit: zero residual sum of squares");
    }

    let f = (((rss_r - rss_u) / order as f64) / (rss_u / df2 as f64)).max(0.0);
    if !f.is_finite() {
        bail!("non-finite F statistic");
    }
    let dist = FisherSnedecor::new(order as f64, df2 as f64)
        .map_err(|e| anyhow::anyhow!("invalid F distribution ({order}, {df2}): {e}"))?;
    Ok(dist.cdf(f))
}

/// Residual sum of squares of the least-squares fit `y ≈ X β`,
/// `x` row-major with `n` rows of `k` regressors.
fn ols_rss(x: &[f64], n: usize, k: usize, y: &[f64]) -> Result<f64> {
    // Normal equations: A = XᵀX (symmetric), b = Xᵀy.
    let mut a = vec![0.0; k * k];
    let mut b = vec![0.0; k];
    for row in 0..n {
        let xr = &x[row * k..(row + 1) * k];
        for i in 0..k {
            b[i] += xr[i] * y[row];
            for j in i..k {
                a[i * k + j] += xr[i] * xr[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            a[i * k + j] = a[j * k + i];
        }
    }

    let beta = cholesky_solve(&mut a, &b, k)?;
    let mut rss = 0.0;
    for row in 0..n {
        let xr = &x[row * k..(row + 1) * k];
        let pred: f64 = xr.iter().zip(&beta).map(|(xi, bi)| xi * bi).sum();
        let r = y[row] - pred;
        rss += r * r;
    }
    Ok(rss)
}

/// Solve `A β = b` for symmetric positive-definite `A` (row-major, k×k)
/// via in-place lower Cholesky. Errs when a pivot collapses, which is how
/// collinear or constant regressors manifest.
fn cholesky_solve(a: &mut [f64], b: &[f64], k: usize) -> Result<Vec<f64>> {
    for i in 0..k {
        for j in 0..=i {
            let mut s = a[i * k + j];
            for p in 0..j {
                s -= a[i * k + p] * a[j * k + p];
            }
            if i == j {
                if s <= 1e-12 {
                    bail!("normal equations not positive definite (collinear regressors)");
                }
                a[i * k + i] = s.sqrt();
            } else {
                a[i * k + j] = s / a[j * k + j];
            }
        }
    }

    // L z = b, then Lᵀ β = z.
    let mut z = vec![0.0; k];
    for i in 0..k {
        let mut s = b[i];
        for p in 0..i {
            s -= a[i * k + p] * z[p];
        }
        z[i] = s / a[i * k + i];
    }
    let mut beta = vec![0.0; k];
    for i in (0..k).rev() {
        let mut s = z[i];
        for p in i + 1..k {
            s -= a[p * k + i] * beta[p];
        }
        beta[i] = s / a[i * k + i];
    }
    Ok(beta)
}
