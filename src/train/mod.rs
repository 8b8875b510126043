//! Gradient computation and the trainers built on it.
//!
//! [`GradientCalculator`] splits a training set between [`GradientWorker`]s, runs them in
//! parallel and sums their gradients and errors. [`Propagation`] applies those gradients with an
//! [`UpdateRule`], and [`LevenbergMarquardt`] uses the per-record derivatives from
//! [`JacobianChainRule`] instead.

mod error;
mod gradient;
mod jacobian;
mod lma;
mod propagation;
mod update;
mod worker;

use std::time::{Duration, Instant};

use log::{debug, info};

pub use error::Error;
pub use gradient::{partition, GradientCalculator};
pub use jacobian::JacobianChainRule;
pub use lma::LevenbergMarquardt;
pub use propagation::Propagation;
pub use update::{
    Backpropagation, ManhattanPropagation, ResilientPropagation, RpropVariant, UpdateRule,
};
pub use worker::GradientWorker;

use crate::network::FlatNetwork;

/// An iterative training algorithm.
pub trait Train {
    /// Runs one training iteration, returning the training error it reports.
    fn iteration(&mut self) -> Result<f64, Error>;

    /// Returns the error reported by the last iteration.
    fn error(&self) -> f64;

    /// Returns the number of successful iterations so far.
    fn iterations(&self) -> usize;

    /// Returns the network being trained.
    fn network(&self) -> &FlatNetwork;
}

/// When to stop [`train`]ing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StopCondition {
    /// Stops after the given number of iterations.
    Iterations(usize),
    /// Stops when the training error drops below the given threshold.
    ErrorThreshold(f64),
    /// Stops once the given time has passed.
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> Self {
        Self::Duration(duration)
    }
}

impl StopCondition {
    /// Returns whether training should stop.
    fn should_stop(&self, iterations: usize, error: f64, start: Instant) -> bool {
        match *self {
            Self::Iterations(max) => iterations >= max,
            Self::ErrorThreshold(threshold) => error < threshold,
            Self::Duration(duration) => start.elapsed() >= duration,
        }
    }
}

/// Runs `trainer` until `stop` is met, returning the final training error.
///
/// Iterations are counted from the start of this call, and `stop` is checked before every
/// iteration, so `Iterations(0)` and an elapsed `Duration` run none. An error threshold is only
/// checked against errors reported during this call. Training also stops, successfully, if a
/// [`LevenbergMarquardt`] trainer can no longer lower the error.
pub fn train<T: Train + ?Sized>(trainer: &mut T, stop: StopCondition) -> Result<f64, Error> {
    let start = Instant::now();
    let mut iterations = 0;
    let mut error = f64::INFINITY;

    while !stop.should_stop(iterations, error, start) {
        error = match trainer.iteration() {
            Ok(error) => error,
            Err(Error::DampingExhausted(lambda)) => {
                info!("stopping, damping reached {} without lowering the error", lambda);
                break;
            }
            Err(e) => return Err(e),
        };
        iterations += 1;
        debug!("iteration {}: error {}", iterations, error);
    }

    info!(
        "trained for {} iterations in {:?}, error {}",
        iterations,
        start.elapsed(),
        trainer.error()
    );

    Ok(trainer.error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::network::FlatLayer;

    /// A trainer whose error halves every iteration
    struct Halving {
        network: FlatNetwork,
        error: f64,
        iterations: usize,
    }

    impl Halving {
        fn new() -> Self {
            Self {
                network: FlatNetwork::new(&[
                    FlatLayer::new(Activation::Linear, 1),
                    FlatLayer::new(Activation::Linear, 1),
                ])
                .unwrap(),
                error: 1.0,
                iterations: 0,
            }
        }
    }

    impl Train for Halving {
        fn iteration(&mut self) -> Result<f64, Error> {
            self.error /= 2.0;
            self.iterations += 1;
            Ok(self.error)
        }

        fn error(&self) -> f64 {
            self.error
        }

        fn iterations(&self) -> usize {
            self.iterations
        }

        fn network(&self) -> &FlatNetwork {
            &self.network
        }
    }

    #[test]
    fn test_stop_iterations() {
        let mut trainer = Halving::new();
        train(&mut trainer, StopCondition::Iterations(5)).unwrap();
        assert_eq!(5, trainer.iterations());

        // Counted per call
        train(&mut trainer, StopCondition::Iterations(3)).unwrap();
        assert_eq!(8, trainer.iterations());

        let error = train(&mut trainer, StopCondition::Iterations(0)).unwrap();
        assert_eq!(8, trainer.iterations());
        assert_eq!(trainer.error(), error);
    }

    #[test]
    fn test_stop_error_threshold() {
        let mut trainer = Halving::new();
        let error = train(&mut trainer, StopCondition::ErrorThreshold(0.1)).unwrap();

        // 1/16 is the first power of two below 0.1
        assert_eq!(0.0625, error);
        assert_eq!(4, trainer.iterations());
    }

    #[test]
    fn test_stop_duration() {
        let mut trainer = Halving::new();
        let stop = StopCondition::from(Duration::from_millis(0));
        assert_eq!(StopCondition::Duration(Duration::ZERO), stop);

        train(&mut trainer, stop).unwrap();
        assert_eq!(0, trainer.iterations());
    }

    /// A trainer that fails on its first iteration
    struct Failing(FlatNetwork, Error);

    impl Train for Failing {
        fn iteration(&mut self) -> Result<f64, Error> {
            Err(self.1.clone())
        }

        fn error(&self) -> f64 {
            0.5
        }

        fn iterations(&self) -> usize {
            0
        }

        fn network(&self) -> &FlatNetwork {
            &self.0
        }
    }

    #[test]
    fn test_errors() {
        let network = Halving::new().network;

        let mut exhausted = Failing(network.clone(), Error::DampingExhausted(1e26));
        assert_eq!(Ok(0.5), train(&mut exhausted, StopCondition::Iterations(10)));

        let mut failing = Failing(network, Error::EmptyTrainingSet);
        assert_eq!(
            Err(Error::EmptyTrainingSet),
            train(&mut failing, StopCondition::Iterations(10))
        );
    }
}
