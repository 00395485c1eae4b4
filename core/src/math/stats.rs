pub struct StatsHelper;

impl StatsHelper {
    /// Largest sample, `None` for an empty slice.
    pub fn max(samples: &[f64]) -> Option<f64> {
        samples.iter().copied().reduce(f64::max)
    }

    /// Differences between consecutive samples, one shorter than the input.
    pub fn deltas(samples: &[f64]) -> Vec<f64> {
        samples.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }
}
