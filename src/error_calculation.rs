//! Accumulation of training error across samples.

use crate::network::Error;

/// How [`ErrorCalculation::calculate`] reduces the accumulated squared error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Root mean square error.
    #[default]
    Rms,
    /// Mean square error.
    Mse,
    /// Half of the sum of squared errors.
    Ess,
}

/// A running sum of squared errors and the number of values that contributed to it.
///
/// Sums and counts are kept separately so that accumulators filled over different parts of a data
/// set can be [`merge`][Self::merge]d into the exact error of the whole set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorCalculation {
    sum_squares: f64,
    count: usize,
    mode: ErrorMode,
}

impl ErrorCalculation {
    /// Returns an empty `ErrorCalculation` that reports RMS error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an empty `ErrorCalculation` that reports error using `mode`.
    pub fn with_mode(mode: ErrorMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Clears the accumulated error.
    pub fn reset(&mut self) {
        self.sum_squares = 0.0;
        self.count = 0;
    }

    /// Adds the squared difference of each pair of values. The count grows by the number of
    /// values.
    pub fn update_error(&mut self, actual: &[f64], ideal: &[f64]) {
        for (a, i) in actual.iter().zip(ideal) {
            let delta = i - a;
            self.sum_squares += delta * delta;
        }
        self.count += actual.len().min(ideal.len());
    }

    /// Adds the squared difference of a single value.
    pub fn update_error_single(&mut self, actual: f64, ideal: f64) {
        let delta = ideal - actual;
        self.sum_squares += delta * delta;
        self.count += 1;
    }

    /// Adds the error accumulated by `other` to this one.
    pub fn merge(&mut self, other: &ErrorCalculation) {
        self.sum_squares += other.sum_squares;
        self.count += other.count;
    }

    /// Returns the accumulated sum of squared errors.
    pub fn sum_squares(&self) -> f64 {
        self.sum_squares
    }

    /// Returns the number of values accumulated.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the error mode used by [`calculate`][Self::calculate].
    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    /// Returns the accumulated error, or [`Error::NoSamples`] if nothing has been accumulated
    /// since the last reset.
    pub fn calculate(&self) -> Result<f64, Error> {
        if self.count == 0 {
            return Err(Error::NoSamples);
        }

        let mean = self.sum_squares / self.count as f64;
        Ok(match self.mode {
            ErrorMode::Rms => mean.sqrt(),
            ErrorMode::Mse => mean,
            ErrorMode::Ess => self.sum_squares / 2.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    const ACTUAL: [f64; 3] = [0.5, 1.0, -1.0];
    const IDEAL: [f64; 3] = [1.0, 1.0, 1.0];

    #[test]
    fn test_calculate() {
        let mut calc = ErrorCalculation::new();
        calc.update_error(&ACTUAL, &IDEAL);

        assert_approx_eq!(4.25, calc.sum_squares());
        assert_eq!(3, calc.count());
        assert_approx_eq!((4.25f64 / 3.0).sqrt(), calc.calculate().unwrap());
    }

    #[test]
    fn test_modes() {
        for (mode, expected) in [
            (ErrorMode::Rms, (4.25f64 / 3.0).sqrt()),
            (ErrorMode::Mse, 4.25 / 3.0),
            (ErrorMode::Ess, 2.125),
        ] {
            let mut calc = ErrorCalculation::with_mode(mode);
            calc.update_error(&ACTUAL, &IDEAL);
            assert_approx_eq!(expected, calc.calculate().unwrap());
        }
    }

    #[test]
    fn test_repeated_samples() {
        let mut once = ErrorCalculation::new();
        once.update_error(&ACTUAL, &IDEAL);

        let mut twice = ErrorCalculation::new();
        twice.reset();
        twice.update_error(&ACTUAL, &IDEAL);
        twice.update_error(&ACTUAL, &IDEAL);

        assert_approx_eq!(2.0 * once.sum_squares(), twice.sum_squares());
        assert_eq!(2 * once.count(), twice.count());

        let n = once.count() as f64;
        let sum = once.sum_squares();
        assert_approx_eq!((2.0 * sum / (2.0 * n)).sqrt(), twice.calculate().unwrap());
        assert_approx_eq!((sum / n).sqrt(), once.calculate().unwrap());
    }

    #[test]
    fn test_no_samples() {
        let mut calc = ErrorCalculation::new();
        assert_eq!(Err(Error::NoSamples), calc.calculate());

        calc.update_error_single(0.0, 2.0);
        assert_approx_eq!(2.0, calc.calculate().unwrap());

        calc.reset();
        assert_eq!(Err(Error::NoSamples), calc.calculate());
    }

    #[test]
    fn test_merge_weights_by_count() {
        // Unequal partitions: one value with error 3, three values with error 1
        let mut a = ErrorCalculation::new();
        a.update_error_single(0.0, 3.0);
        let mut b = ErrorCalculation::new();
        b.update_error(&[0.0; 3], &[1.0; 3]);

        let mut merged = ErrorCalculation::new();
        merged.merge(&a);
        merged.merge(&b);

        assert_eq!(4, merged.count());
        assert_approx_eq!(3f64.sqrt(), merged.calculate().unwrap());

        // Averaging the per-partition errors would give 2
        let naive = (a.calculate().unwrap() + b.calculate().unwrap()) / 2.0;
        assert!((naive - merged.calculate().unwrap()).abs() > 0.2);
    }
}
