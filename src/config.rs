//! Run configuration.
//!
//! [`CausalityConfig`] holds every tunable parameter of a per-subject
//! Granger-causality run. All fields are `pub` so a config can be built
//! with struct-update syntax from [`CausalityConfig::default()`].

/// Configuration for one per-subject causality run.
///
/// ```
/// use bold_ec::CausalityConfig;
///
/// let cfg = CausalityConfig {
///     max_lag: 5,            // test lags 1..=5 (as negative offsets)
///     keep_separate: true,   // also write one TSV per ROI pair
///     ..CausalityConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CausalityConfig {
    /// Fraction of the recording to analyse, in percent of the number of
    /// time-points. The analysed length is `floor(T · length_percent/100)`.
    ///
    /// Default: `100.0`.
    pub length_percent: f64,

    /// 1-based ROI subset to analyse, `None` for all ROIs in the file.
    ///
    /// Default: `None`.
    pub rois: Option<Vec<usize>>,

    /// Maximum tested lag. Lags `1..=max_lag` are each tested with an
    /// independent per-lag call; tables report them as the negative axis
    /// `[-max_lag, …, -1]` (offsets into the past).
    ///
    /// Default: `10`.
    pub max_lag: usize,

    /// Number of surrogate series for significance testing. Part of the
    /// documented surface for parity with surrogate-based causality
    /// methods; the Granger F-test path derives its p-value analytically
    /// and ignores it.
    ///
    /// Default: `100`.
    pub num_surrogates: usize,

    /// Also write one compact per-pair table under `Numerical/` in
    /// addition to the combined per-subject table.
    ///
    /// Default: `false`.
    pub keep_separate: bool,
}

impl Default for CausalityConfig {
    fn default() -> Self {
        Self {
            length_percent: 100.0,
            rois: None,
            max_lag: 10,
            num_surrogates: 100,
            keep_separate: false,
        }
    }
}

impl CausalityConfig {
    /// Tested lag orders, `1..=max_lag`.
    pub fn tested_lags(&self) -> Vec<usize> {
        (1..=self.max_lag).collect()
    }

    /// Lag axis as reported in every output table: negated and reversed,
    /// i.e. `[-max_lag, …, -1]` in increasing order.
    pub fn reported_lags(&self) -> Vec<i64> {
        (1..=self.max_lag as i64).map(|l| l - 1 - self.max_lag as i64).collect()
    }

    /// Number of time-points analysed out of a recording of length `t`,
    /// clamped to `t` so an over-100 percentage never overruns the data.
    pub fn analysed_length(&self, t: usize) -> usize {
        ((t as f64 * 0.01 * self.length_percent) as usize).min(t)
    }
}
