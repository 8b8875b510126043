//! Levenberg-Marquardt training for single-output networks.

use log::debug;

use super::jacobian::JacobianChainRule;
use super::{Error, Train};
use crate::data::DataSet;
use crate::error_calculation::{ErrorCalculation, ErrorMode};
use crate::network::FlatNetwork;

const INITIAL_LAMBDA: f64 = 0.1;
const SCALE_LAMBDA: f64 = 10.0;
const MAX_LAMBDA: f64 = 1e25;

// Pivots smaller than this make the damped system singular
const PIVOT_EPSILON: f64 = 1e-12;

/// Trains a single-output network with the Levenberg-Marquardt algorithm.
///
/// Each iteration computes the Jacobian of the network over the whole training set, then solves
/// `(JᵗJ + λI) δ = Jᵗe` for a weight step. A step is only kept if it lowers the error. Rejected
/// steps raise the damping `λ`, moving the next attempt towards a short gradient descent step,
/// and accepted ones lower it, moving towards a Gauss-Newton step.
#[derive(Debug)]
pub struct LevenbergMarquardt<'a, D: DataSet + ?Sized> {
    network: FlatNetwork,
    data: &'a D,
    chain: JacobianChainRule,
    lambda: f64,
    // JᵗJ, one row per weight
    hessian: Vec<Vec<f64>>,
    // Jᵗe
    gradient: Vec<f64>,
    error: f64,
    iterations: usize,
}

impl<'a, D: DataSet + ?Sized> LevenbergMarquardt<'a, D> {
    /// Returns a new trainer for `network` over `data`.
    ///
    /// Returns an error if the network has more than one output, or if `data` is empty or does
    /// not match the network.
    pub fn new(network: FlatNetwork, data: &'a D) -> Result<Self, Error> {
        let chain = JacobianChainRule::new(&network, data)?;
        let weight_count = network.weights().len();

        Ok(Self {
            network,
            data,
            chain,
            lambda: INITIAL_LAMBDA,
            hessian: vec![vec![0.0; weight_count]; weight_count],
            gradient: vec![0.0; weight_count],
            error: 0.0,
            iterations: 0,
        })
    }

    /// Returns the current damping factor.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Consumes the trainer, returning the trained network.
    pub fn into_network(self) -> FlatNetwork {
        self.network
    }

    /// Builds `JᵗJ` and `Jᵗe` from the last Jacobian.
    fn build_system(&mut self) {
        for row in &mut self.hessian {
            row.iter_mut().for_each(|h| *h = 0.0);
        }
        self.gradient.iter_mut().for_each(|g| *g = 0.0);

        for (row, &error) in self.chain.jacobian().iter().zip(self.chain.row_errors()) {
            for (i, &ji) in row.iter().enumerate() {
                self.gradient[i] += ji * error;
                // JᵗJ is symmetric, fill the lower triangle and mirror it afterwards
                for (h, &jj) in self.hessian[i][..=i].iter_mut().zip(row) {
                    *h += ji * jj;
                }
            }
        }

        for i in 0..self.hessian.len() {
            for j in 0..i {
                self.hessian[j][i] = self.hessian[i][j];
            }
        }
    }

    /// Solves the system damped by the current `λ`, returning `None` if it is singular.
    fn solve_damped(&self) -> Option<Vec<f64>> {
        let mut matrix = self.hessian.clone();
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] += self.lambda;
        }

        solve(matrix, self.gradient.clone())
    }

    fn rms(&self, half_squared_error: f64) -> f64 {
        (2.0 * half_squared_error / self.data.len() as f64).sqrt()
    }
}

impl<'a, D: DataSet + ?Sized> Train for LevenbergMarquardt<'a, D> {
    /// Takes one damped step. Returns the RMS error of the network after the step.
    ///
    /// If `λ` grows past its limit without any step lowering the error, the weights are left
    /// unchanged, `λ` is reset, and [`Error::DampingExhausted`] is returned. This usually means
    /// the network is at a minimum.
    fn iteration(&mut self) -> Result<f64, Error> {
        let weights = self.network.weights().to_vec();
        let start = self.chain.calculate(&mut self.network, self.data, &weights)?;
        self.error = self.rms(start);
        self.build_system();

        loop {
            if let Some(step) = self.solve_damped() {
                let trial = weights
                    .iter()
                    .zip(&step)
                    .map(|(w, d)| w + d)
                    .collect::<Vec<_>>();
                self.network.set_weights(&trial)?;

                let error = half_squared_error(&mut self.network, self.data)?;
                if error < start {
                    self.lambda /= SCALE_LAMBDA;
                    self.error = self.rms(error);
                    self.iterations += 1;
                    return Ok(self.error);
                }
            }

            self.lambda *= SCALE_LAMBDA;
            if self.lambda > MAX_LAMBDA {
                self.network.set_weights(&weights)?;
                let lambda = self.lambda;
                self.lambda = INITIAL_LAMBDA;
                debug!("damping reached {} without lowering the error", lambda);
                return Err(Error::DampingExhausted(lambda));
            }
        }
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

/// Returns half the sum of squared errors of `network` over `data`.
fn half_squared_error<D: DataSet + ?Sized>(
    network: &mut FlatNetwork,
    data: &D,
) -> Result<f64, Error> {
    let mut errors = ErrorCalculation::with_mode(ErrorMode::Ess);

    for i in 0..data.len() {
        let pair = data.record(i)?;
        let output = network.evaluate(pair.input)?;
        errors.update_error(output, pair.ideal);
    }

    Ok(errors.calculate()?)
}

/// Solves `matrix * x = rhs` by Gaussian elimination with partial pivoting. Returns `None` if the
/// matrix is singular.
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();

    for col in 0..n {
        let pivot =
            (col..n).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot][col].abs() <= PIVOT_EPSILON {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..n {
            let factor = matrix[row][col] / matrix[col][col];
            if factor == 0.0 {
                continue;
            }
            let (upper, lower) = matrix.split_at_mut(row);
            for (x, &p) in lower[0][col..].iter_mut().zip(&upper[col][col..]) {
                *x -= factor * p;
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let sum = (row + 1..n).map(|j| matrix[row][j] * x[j]).sum::<f64>();
        x[row] = (rhs[row] - sum) / matrix[row][row];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::activation::Activation;
    use crate::network::FlatLayer;

    #[test]
    fn test_solve() {
        let matrix = vec![
            vec![0.0, 2.0, 1.0],
            vec![1.0, 1.0, 1.0],
            vec![2.0, 1.0, -1.0],
        ];
        // x = (1, 2, 3)
        let x = solve(matrix, vec![7.0, 6.0, 1.0]).unwrap();

        assert_approx_eq!(1.0, x[0]);
        assert_approx_eq!(2.0, x[1]);
        assert_approx_eq!(3.0, x[2]);
    }

    #[test]
    fn test_solve_singular() {
        let matrix = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(None, solve(matrix, vec![1.0, 2.0]));
    }

    #[test]
    fn test_fits_line() {
        let data = [-1.0, -0.5, 0.0, 0.5, 1.0]
            .iter()
            .map(|&x| ([x], [2.0 * x + 1.0]))
            .collect::<Vec<_>>();
        let network = FlatNetwork::new(&[
            FlatLayer::new(Activation::Linear, 1).with_bias(1.0),
            FlatLayer::new(Activation::Linear, 1),
        ])
        .unwrap();

        let mut trainer = LevenbergMarquardt::new(network, &data[..]).unwrap();
        let mut last = f64::INFINITY;
        for _ in 0..20 {
            match trainer.iteration() {
                Ok(error) => {
                    assert!(error < last);
                    last = error;
                }
                Err(Error::DampingExhausted(_)) => break,
                Err(e) => panic!("{}", e),
            }
        }

        assert!(trainer.error() < 1e-6);
        let weights = trainer.network().weights();
        assert_approx_eq!(2.0, weights[0], 1e-5);
        assert_approx_eq!(1.0, weights[1], 1e-5);
    }

    #[test]
    fn test_lowers_error() {
        let data = vec![
            ([0.0, 0.0], [0.1]),
            ([0.0, 1.0], [0.9]),
            ([1.0, 0.0], [0.9]),
            ([1.0, 1.0], [0.1]),
        ];
        let mut network =
            FlatNetwork::with_hidden(2, &[3], 1, Activation::Tanh, Activation::Sigmoid).unwrap();
        network.nguyen_widrow(&mut StdRng::seed_from_u64(11));
        let initial = network.calculate_error(&data[..]).unwrap();

        let mut trainer = LevenbergMarquardt::new(network, &data[..]).unwrap();
        for _ in 0..10 {
            if trainer.iteration().is_err() {
                break;
            }
        }

        let mut network = trainer.into_network();
        assert!(network.calculate_error(&data[..]).unwrap() < initial);
    }

    #[test]
    fn test_exhausted_damping_restores_weights() {
        // A perfect fit cannot be improved on
        let data = [([1.0], [0.0])];
        let network = FlatNetwork::new(&[
            FlatLayer::new(Activation::Linear, 1),
            FlatLayer::new(Activation::Linear, 1),
        ])
        .unwrap();

        let mut trainer = LevenbergMarquardt::new(network, &data[..]).unwrap();
        match trainer.iteration() {
            Err(Error::DampingExhausted(lambda)) => assert!(lambda > MAX_LAMBDA),
            other => panic!("expected exhausted damping, got {:?}", other),
        }

        assert_eq!(&[0.0], trainer.network().weights());
        assert_approx_eq!(INITIAL_LAMBDA, trainer.lambda());
        assert_eq!(0, trainer.iterations());
    }
}
