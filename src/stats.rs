//! Summary statistics over data point values
//!
//! Double precision throughout: ratios are compared against thresholds
//! like 0.2 and must not pick up single-precision rounding.

/// Running accumulator (Welford) for mean and sample variance
#[derive(Debug, Clone, Default)]
pub struct SummaryStatistics {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl SummaryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value
    pub fn add_value(&mut self, x: f64) {
        if self.count == 0 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }

        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Arithmetic mean, NaN when empty
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    /// Sample variance (n - 1 denominator), 0 for a single value
    pub fn variance(&self) -> f64 {
        match self.count {
            0 => f64::NAN,
            1 => 0.0,
            n => self.m2 / (n - 1) as f64,
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.max
        }
    }
}

impl FromIterator<f64> for SummaryStatistics {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        for x in iter {
            stats.add_value(x);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_stddev() {
        let stats: SummaryStatistics = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .into_iter()
            .collect();

        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        // sample variance = 32 / 7
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(stats.min(), 2.0);
        assert_eq!(stats.max(), 9.0);
    }

    #[test]
    fn test_identical_values_have_exact_mean() {
        let stats: SummaryStatistics = std::iter::repeat(100.0).take(5).collect();
        assert_eq!(stats.mean(), 100.0);
        assert_eq!(stats.stddev(), 0.0);
    }

    #[test]
    fn test_single_value() {
        let stats: SummaryStatistics = std::iter::once(3.5).collect();
        assert_eq!(stats.mean(), 3.5);
        assert_eq!(stats.variance(), 0.0);
        assert_eq!(stats.min(), 3.5);
        assert_eq!(stats.max(), 3.5);
    }

    #[test]
    fn test_empty_is_nan() {
        let stats = SummaryStatistics::new();
        assert!(stats.mean().is_nan());
        assert!(stats.variance().is_nan());
        assert!(stats.min().is_nan());
    }

    #[test]
    fn test_negative_values() {
        let stats: SummaryStatistics = [-1.0, -3.0].into_iter().collect();
        assert_eq!(stats.mean(), -2.0);
        assert_eq!(stats.min(), -3.0);
        assert_eq!(stats.max(), -1.0);
    }
}
