//! Gradient computation over one partition of a training set.

use std::ops::Range;

use crate::data::DataSet;
use crate::error_calculation::ErrorCalculation;
use crate::network::{self, FlatNetwork, LayerState};

/// Computes the gradients and error of a network over one contiguous range of training records.
///
/// A worker owns every buffer it writes to, so workers over disjoint ranges can run at the same
/// time against one shared network.
#[derive(Clone, Debug)]
pub struct GradientWorker {
    // The training records this worker is responsible for
    range: Range<usize>,
    // The accumulated gradient of every weight
    gradients: Vec<f64>,
    // The error signal of every neuron for the current record
    layer_delta: Vec<f64>,
    // The network output for the current record
    actual: Vec<f64>,
    state: LayerState,
    errors: ErrorCalculation,
    // The derivative offset of every layer
    flat_spot: Vec<f64>,
}

impl GradientWorker {
    /// Returns a new worker for the records in `range`, with buffers sized for `network`.
    pub fn new(network: &FlatNetwork, range: Range<usize>, fix_flat_spot: bool) -> Self {
        Self {
            range,
            gradients: vec![0.0; network.weights().len()],
            layer_delta: vec![0.0; network.neuron_count()],
            actual: vec![0.0; network.output_count()],
            state: LayerState::new(network),
            errors: ErrorCalculation::new(),
            flat_spot: flat_spots(network, fix_flat_spot),
        }
    }

    /// Returns the range of training records this worker processes.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Returns the gradients accumulated by the last [`run`][Self::run].
    pub fn gradients(&self) -> &[f64] {
        &self.gradients
    }

    /// Returns the error accumulated by the last [`run`][Self::run].
    pub fn errors(&self) -> &ErrorCalculation {
        &self.errors
    }

    /// Clears the gradients and error, then accumulates them over every record in this worker's
    /// range.
    ///
    /// On failure the gradients and error are incomplete and must not be used.
    pub fn run<D: DataSet + ?Sized>(
        &mut self,
        network: &FlatNetwork,
        data: &D,
    ) -> Result<(), network::Error> {
        self.gradients.iter_mut().for_each(|g| *g = 0.0);
        self.errors.reset();

        for index in self.range.clone() {
            let pair = data.record(index)?;
            self.process(network, pair.input, pair.ideal)?;
        }

        Ok(())
    }

    /// Runs the forward and backward pass for a single record.
    fn process(
        &mut self,
        network: &FlatNetwork,
        input: &[f64],
        ideal: &[f64],
    ) -> Result<(), network::Error> {
        if ideal.len() != network.output_count() {
            return Err(network::Error::InvalidIdealSize(
                network.output_count(),
                ideal.len(),
            ));
        }

        network.compute_with(input, &mut self.state)?;
        self.actual.copy_from_slice(network.output_of(&self.state));
        self.errors.update_error(&self.actual, ideal);

        let last = network.layer_count() - 1;
        let start = network.layer_index()[last];
        let activation = network.activations()[last];
        let output = self.state.layer_output();
        let sums = self.state.layer_sums();

        for (i, (actual, ideal)) in self.actual.iter().zip(ideal).enumerate() {
            let n = start + i;
            let derivative = activation.derivative(sums[n], output[n]) + self.flat_spot[last];
            self.layer_delta[n] = derivative * (ideal - actual);
        }

        backpropagate(
            network,
            &self.state,
            &self.flat_spot,
            &mut self.layer_delta,
            &mut self.gradients,
        );

        Ok(())
    }
}

/// Returns the derivative offset of every layer of `network`.
pub(crate) fn flat_spots(network: &FlatNetwork, fix_flat_spot: bool) -> Vec<f64> {
    network
        .activations()
        .iter()
        .map(|activation| {
            if fix_flat_spot {
                activation.flat_spot()
            } else {
                0.0
            }
        })
        .collect()
}

/// Sweeps backwards from the output layer, adding `output * delta` for every weight to
/// `gradients` and filling in the delta of every hidden neuron.
///
/// The output layer's deltas must already be set in `layer_delta`, and `state` must hold the
/// forward pass they were computed from.
pub(crate) fn backpropagate(
    network: &FlatNetwork,
    state: &LayerState,
    flat_spot: &[f64],
    layer_delta: &mut [f64],
    gradients: &mut [f64],
) {
    let weights = network.weights();
    let output = state.layer_output();
    let sums = state.layer_sums();

    for to_layer in (1..network.layer_count()).rev() {
        let from_layer = to_layer - 1;
        let from_start = network.layer_index()[from_layer];
        let from_total = network.layer_counts()[from_layer];
        let from_count = network.layer_feed_counts()[from_layer];
        let to_start = network.layer_index()[to_layer];
        let to_count = network.layer_feed_counts()[to_layer];
        let base = network.weight_index()[to_layer];
        let activation = network.activations()[from_layer];

        let (before, after) = layer_delta.split_at_mut(to_start);
        let to_delta = &after[..to_count];

        for from in 0..from_total {
            let n = from_start + from;
            let x = output[n];
            let mut sum = 0.0;

            // Weights from one neuron are strided by the size of its layer
            let mut index = base + from;
            for delta in to_delta {
                gradients[index] += x * delta;
                sum += weights[index] * delta;
                index += from_total;
            }

            // Input and bias neurons have no delta
            if from_layer > 0 && from < from_count {
                let derivative = activation.derivative(sums[n], output[n]) + flat_spot[from_layer];
                before[n] = sum * derivative;
            }
        }
    }
}
