/// Fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LinearFit {
    pub(crate) slope: f64,
    pub(crate) intercept: f64,
}

impl LinearFit {
    pub(crate) fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares over an append-only point stream.
///
/// Keeps running sums so refitting after every push is O(1). x values are
/// shifted by the first x seen to keep the sums well conditioned for
/// millisecond-scale inputs.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegressionAccumulator {
    origin: Option<f64>,
    n: f64,
    sum_x: f64,
    sum_y: f64,
    sum_xy: f64,
    sum_xx: f64,
}

impl RegressionAccumulator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, x: f64, y: f64) {
        let origin = *self.origin.get_or_insert(x);
        let dx = x - origin;

        self.n += 1.0;
        self.sum_x += dx;
        self.sum_y += y;
        self.sum_xy += dx * y;
        self.sum_xx += dx * dx;
    }

    pub(crate) fn len(&self) -> usize {
        self.n as usize
    }

    /// None with fewer than two distinct x values.
    pub(crate) fn fit(&self) -> Option<LinearFit> {
        let origin = self.origin?;
        let denom = self.n * self.sum_xx - self.sum_x * self.sum_x;
        if self.n < 2.0 || denom.abs() < f64::EPSILON {
            return None;
        }

        let slope = (self.n * self.sum_xy - self.sum_x * self.sum_y) / denom;
        let shifted_intercept = (self.sum_y - slope * self.sum_x) / self.n;

        Some(LinearFit {
            slope,
            intercept: shifted_intercept - slope * origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let mut acc = RegressionAccumulator::new();
        for x in 0..10 {
            let x = 1_000_000.0 + x as f64 * 3_600_000.0;
            acc.push(x, 2.0 * x + 500.0);
        }

        let fit = acc.fit().unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 500.0).abs() < 1e-3);
        assert_eq!(acc.len(), 10);
    }

    #[test]
    fn test_noisy_fit_passes_through_means() {
        let mut acc = RegressionAccumulator::new();
        let points = [(1.0, 2.0), (2.0, 2.5), (3.0, 4.5), (4.0, 5.0)];
        for (x, y) in points {
            acc.push(x, y);
        }

        let fit = acc.fit().unwrap();
        // slope = cov(x, y) / var(x) = 1.1, line passes through (2.5, 3.5)
        assert!((fit.slope - 1.1).abs() < 1e-12);
        assert!((fit.at(2.5) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        let mut acc = RegressionAccumulator::new();
        assert!(acc.fit().is_none());
        acc.push(5.0, 1.0);
        assert!(acc.fit().is_none());
        acc.push(5.0, 3.0);
        assert!(acc.fit().is_none());
    }
}
