//! Jacobian computation for Levenberg-Marquardt training.

use super::worker::backpropagate;
use super::Error;
use crate::data::DataSet;
use crate::network::{self, FlatNetwork, LayerState};

/// Computes the Jacobian of a single-output network over a training set with the chain rule.
///
/// Row `i` of the Jacobian holds the derivative of the network output for record `i` with
/// respect to every weight. This is the same backward sweep used for gradients, except that each
/// record keeps its own row instead of being summed into one vector.
#[derive(Clone, Debug)]
pub struct JacobianChainRule {
    jacobian: Vec<Vec<f64>>,
    // The residual `ideal - output` of every record
    row_errors: Vec<f64>,
    layer_delta: Vec<f64>,
    state: LayerState,
    // All zero; the Jacobian uses exact derivatives
    flat_spot: Vec<f64>,
    // The layout the buffers were sized for
    layer_counts: Vec<usize>,
}

impl JacobianChainRule {
    /// Returns a new `JacobianChainRule` sized for `network` and `data`.
    pub fn new<D: DataSet + ?Sized>(network: &FlatNetwork, data: &D) -> Result<Self, Error> {
        if network.output_count() != 1 {
            return Err(Error::UnsupportedOutputCount(network.output_count()));
        }
        if data.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }
        if network.input_count() != data.input_size() {
            return Err(Error::InputSizeMismatch(
                network.input_count(),
                data.input_size(),
            ));
        }
        if data.ideal_size() != 1 {
            return Err(Error::IdealSizeMismatch(1, data.ideal_size()));
        }

        Ok(Self {
            jacobian: vec![vec![0.0; network.weights().len()]; data.len()],
            row_errors: vec![0.0; data.len()],
            layer_delta: vec![0.0; network.neuron_count()],
            state: LayerState::new(network),
            flat_spot: vec![0.0; network.layer_count()],
            layer_counts: network.layer_counts().to_vec(),
        })
    }

    /// Writes `weights` into `network`, then rebuilds the Jacobian and the row errors from every
    /// record of `data`. Returns half the sum of squared row errors.
    pub fn calculate<D: DataSet + ?Sized>(
        &mut self,
        network: &mut FlatNetwork,
        data: &D,
        weights: &[f64],
    ) -> Result<f64, Error> {
        if network.output_count() != 1 {
            return Err(Error::UnsupportedOutputCount(network.output_count()));
        }
        if network.layer_counts() != self.layer_counts.as_slice() {
            return Err(Error::NetworkMismatch);
        }

        network.set_weights(weights)?;

        let weight_count = weights.len();
        self.jacobian
            .resize_with(data.len(), || vec![0.0; weight_count]);
        self.row_errors.resize(data.len(), 0.0);

        let last = network.layer_count() - 1;
        let output_index = network.layer_index()[last];
        let activation = network.activations()[last];
        let network = &*network;

        let mut sum_squares = 0.0;
        for (i, row) in self.jacobian.iter_mut().enumerate() {
            let pair = data.record(i)?;
            if pair.ideal.len() != 1 {
                return Err(network::Error::InvalidIdealSize(1, pair.ideal.len()).into());
            }

            network.compute_with(pair.input, &mut self.state)?;

            let output = self.state.layer_output()[output_index];
            let error = pair.ideal[0] - output;
            self.row_errors[i] = error;
            sum_squares += error * error;

            let sum = self.state.layer_sums()[output_index];
            self.layer_delta[output_index] = activation.derivative(sum, output);

            row.iter_mut().for_each(|d| *d = 0.0);
            backpropagate(
                network,
                &self.state,
                &self.flat_spot,
                &mut self.layer_delta,
                row,
            );
        }

        Ok(sum_squares / 2.0)
    }

    /// Returns the Jacobian, one row per training record and one column per weight.
    pub fn jacobian(&self) -> &[Vec<f64>] {
        &self.jacobian
    }

    /// Returns the residual `ideal - output` of every training record.
    pub fn row_errors(&self) -> &[f64] {
        &self.row_errors
    }
}
