//! Evaluation of networks.

use super::{Error, FlatNetwork};

/// The transient per-neuron values produced by a forward pass.
///
/// A forward pass only reads the network, so any number of `LayerState`s can be filled from the
/// same [`FlatNetwork`] at once. Each concurrent evaluation must use its own state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerState {
    // The activated output of every neuron
    layer_output: Vec<f64>,
    // The weighted sum of every neuron before activation
    layer_sums: Vec<f64>,
}

impl LayerState {
    /// Returns a new `LayerState` sized for `network`, with its bias neurons set.
    pub fn new(network: &FlatNetwork) -> Self {
        let mut state = Self {
            layer_output: vec![0.0; network.neuron_count()],
            layer_sums: vec![0.0; network.neuron_count()],
        };
        state.set_biases(network);
        state
    }

    /// Returns the activated output of every neuron.
    pub fn layer_output(&self) -> &[f64] {
        &self.layer_output
    }

    /// Returns the weighted sum of every neuron before activation.
    pub fn layer_sums(&self) -> &[f64] {
        &self.layer_sums
    }

    fn set_biases(&mut self, network: &FlatNetwork) {
        for (l, bias) in network.bias_activations.iter().enumerate() {
            if let Some(bias) = bias {
                let index = network.layer_index[l] + network.layer_feed_counts[l];
                self.layer_output[index] = *bias;
            }
        }
    }
}

impl FlatNetwork {
    /// Evaluates the network with the given inputs, writing every neuron's value to `state`.
    ///
    /// This never modifies the network. The outputs can be read with
    /// [`output_of`][Self::output_of].
    pub fn compute_with(&self, input: &[f64], state: &mut LayerState) -> Result<(), Error> {
        if input.len() != self.input_count() {
            return Err(Error::InvalidInputSize(self.input_count(), input.len()));
        }

        // States can come from deserialized networks or from a differently shaped network
        if state.layer_output.len() != self.neuron_count() {
            *state = LayerState::new(self);
        }

        state.layer_output[..input.len()].copy_from_slice(input);

        for to_layer in 1..self.layer_count() {
            self.compute_layer(to_layer, state);
        }

        Ok(())
    }

    /// Computes the outputs of `to_layer` from the outputs of the layer before it.
    fn compute_layer(&self, to_layer: usize, state: &mut LayerState) {
        let from_start = self.layer_index[to_layer - 1];
        let from_count = self.layer_counts[to_layer - 1];
        let to_start = self.layer_index[to_layer];
        let to_count = self.layer_feed_counts[to_layer];
        let activation = self.activations[to_layer];

        let (before, after) = state.layer_output.split_at_mut(to_start);
        let from = &before[from_start..from_start + from_count];
        let sums = &mut state.layer_sums[to_start..to_start + to_count];
        let rows = self.weights[self.weight_index[to_layer]..].chunks_exact(from_count);

        for ((output, sum), row) in after[..to_count].iter_mut().zip(sums).zip(rows) {
            let total: f64 = row.iter().zip(from).map(|(w, x)| w * x).sum();
            *sum = total;
            *output = activation.activate(total);
        }
    }
}
