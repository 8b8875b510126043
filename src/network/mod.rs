//! The flat neural network struct.

mod error;
mod evaluate;
mod layer;
mod randomize;

pub use error::Error;
pub use evaluate::LayerState;
pub use layer::FlatLayer;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::activation::Activation;
use crate::data::DataSet;
use crate::error_calculation::ErrorCalculation;

/// A feed-forward neural network encoded as flat arrays.
///
/// Layers are ordered from the input layer to the output layer. Every neuron of every layer
/// occupies one slot of the flat layer output array, starting at `layer_index[layer]`. The bias
/// neuron of a layer, if any, occupies the last slot of that layer.
///
/// The weights feeding layer `l` start at `weight_index[l]` and are stored one row per receiving
/// neuron, so the weight from neuron `from` of layer `l - 1` to neuron `to` of layer `l` is at
/// `weight_index[l] + to * layer_counts[l - 1] + from`. The input layer has no incoming weights.
///
/// Bias neurons never receive weights, so a layer's feed count excludes its bias neuron while its
/// total count includes it.
// NOTE: The offset tables are computed once in `new` and never change afterwards. Only the
//       weights are mutated between training epochs
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FlatNetwork {
    // The number of neurons in each layer, including bias neurons
    layer_counts: Vec<usize>,
    // The number of neurons in each layer, excluding bias neurons
    layer_feed_counts: Vec<usize>,
    // The offset of each layer into the layer output array
    layer_index: Vec<usize>,
    // The offset of the weights feeding each layer into the weight array
    weight_index: Vec<usize>,
    // The activation function of each layer
    activations: Vec<Activation>,
    // The output of each layer's bias neuron
    bias_activations: Vec<Option<f64>>,
    weights: Vec<f64>,
    // Scratch space for `evaluate`, rebuilt on demand
    #[cfg_attr(feature = "serde", serde(skip))]
    state: LayerState,
}

/// The serialized fields of a [`FlatNetwork`], checked before a network is built from them.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FlatNetworkData {
    layer_counts: Vec<usize>,
    layer_feed_counts: Vec<usize>,
    layer_index: Vec<usize>,
    weight_index: Vec<usize>,
    activations: Vec<Activation>,
    bias_activations: Vec<Option<f64>>,
    weights: Vec<f64>,
}

// Deserialized networks are rebuilt through `FlatNetwork::new`
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for FlatNetwork {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = FlatNetworkData::deserialize(deserializer)?;
        Self::from_data(data).map_err(de::Error::custom)
    }
}

impl FlatNetwork {
    /// Builds a network from layer descriptions ordered from input to output. All weights start
    /// at zero; see [`randomize`][Self::randomize] and [`nguyen_widrow`][Self::nguyen_widrow].
    pub fn new(layers: &[FlatLayer]) -> Result<Self, Error> {
        if layers.len() < 2 {
            return Err(Error::TooFewLayers);
        }

        if let Some(index) = layers.iter().position(|layer| layer.count() == 0) {
            return Err(Error::EmptyLayer(index));
        }

        if layers[layers.len() - 1].bias().is_some() {
            return Err(Error::OutputBias);
        }

        let layer_counts: Vec<usize> = layers.iter().map(FlatLayer::total_count).collect();
        let layer_feed_counts = layers.iter().map(FlatLayer::count).collect::<Vec<_>>();

        let mut layer_index = Vec::with_capacity(layers.len());
        let mut neuron_count = 0;
        for count in &layer_counts {
            layer_index.push(neuron_count);
            neuron_count += count;
        }

        let mut weight_index = Vec::with_capacity(layers.len());
        let mut weight_count = 0;
        weight_index.push(0);
        for l in 1..layers.len() {
            weight_index.push(weight_count);
            weight_count += layer_counts[l - 1] * layer_feed_counts[l];
        }

        let mut network = Self {
            layer_counts,
            layer_feed_counts,
            layer_index,
            weight_index,
            activations: layers.iter().map(FlatLayer::activation).collect(),
            bias_activations: layers.iter().map(FlatLayer::bias).collect(),
            weights: vec![0.0; weight_count],
            state: LayerState::default(),
        };
        network.state = LayerState::new(&network);

        Ok(network)
    }

    /// Builds a network with the given hidden layer sizes. Every layer except the output layer
    /// gets a bias neuron with an output of `1.0`.
    pub fn with_hidden(
        inputs: usize,
        hidden: &[usize],
        outputs: usize,
        hidden_activation: Activation,
        output_activation: Activation,
    ) -> Result<Self, Error> {
        let mut layers = Vec::with_capacity(hidden.len() + 2);
        layers.push(FlatLayer::new(Activation::Linear, inputs).with_bias(1.0));
        for &count in hidden {
            layers.push(FlatLayer::new(hidden_activation, count).with_bias(1.0));
        }
        layers.push(FlatLayer::new(output_activation, outputs));

        Self::new(&layers)
    }

    /// Rebuilds a network from its serialized fields, rejecting tables that `new` would not have
    /// produced.
    #[cfg(feature = "serde")]
    fn from_data(data: FlatNetworkData) -> Result<Self, Error> {
        let layer_count = data.layer_feed_counts.len();
        if data.activations.len() != layer_count || data.bias_activations.len() != layer_count {
            return Err(Error::InvalidLayout);
        }

        let layers = data
            .layer_feed_counts
            .iter()
            .zip(&data.activations)
            .zip(&data.bias_activations)
            .map(|((&count, &activation), bias)| {
                let layer = FlatLayer::new(activation, count);
                match *bias {
                    Some(value) => layer.with_bias(value),
                    None => layer,
                }
            })
            .collect::<Vec<_>>();

        let mut network = Self::new(&layers)?;
        if network.layer_counts != data.layer_counts
            || network.layer_index != data.layer_index
            || network.weight_index != data.weight_index
        {
            return Err(Error::InvalidLayout);
        }
        network.set_weights(&data.weights)?;

        Ok(network)
    }

    /// Evaluates the network with the given inputs using its own scratch state, returning the
    /// outputs.
    ///
    /// The outputs of every layer remain available through
    /// [`layer_output`][Self::layer_output] until the next evaluation.
    pub fn evaluate(&mut self, input: &[f64]) -> Result<&[f64], Error> {
        let mut state = std::mem::take(&mut self.state);
        let result = self.compute_with(input, &mut state);
        self.state = state;
        result?;

        Ok(self.output_of(&self.state))
    }

    /// Evaluates the network with the given inputs, writing the outputs to `output`.
    pub fn compute(&mut self, input: &[f64], output: &mut [f64]) -> Result<(), Error> {
        if output.len() != self.output_count() {
            return Err(Error::InvalidOutputSize(self.output_count(), output.len()));
        }

        output.copy_from_slice(self.evaluate(input)?);
        Ok(())
    }

    /// Returns the output layer section of a [`LayerState`] filled by
    /// [`compute_with`][Self::compute_with].
    pub fn output_of<'a>(&self, state: &'a LayerState) -> &'a [f64] {
        let start = self.layer_index[self.layer_count() - 1];
        &state.layer_output()[start..start + self.output_count()]
    }

    /// Returns the RMS error of the network over every record of `data`.
    pub fn calculate_error<D: DataSet + ?Sized>(&mut self, data: &D) -> Result<f64, Error> {
        let mut errors = ErrorCalculation::new();

        for i in 0..data.len() {
            let pair = data.record(i)?;
            if pair.ideal.len() != self.output_count() {
                return Err(Error::InvalidIdealSize(self.output_count(), pair.ideal.len()));
            }
            let output = self.evaluate(pair.input)?;
            errors.update_error(output, pair.ideal);
        }

        errors.calculate()
    }

    /// Returns the number of inputs required by this network.
    pub fn input_count(&self) -> usize {
        self.layer_feed_counts[0]
    }

    /// Returns the number of outputs produced by this network.
    pub fn output_count(&self) -> usize {
        self.layer_feed_counts[self.layer_count() - 1]
    }

    /// Returns the number of layers, including the input and output layers.
    pub fn layer_count(&self) -> usize {
        self.layer_counts.len()
    }

    /// Returns the number of neurons across all layers, including bias neurons.
    pub fn neuron_count(&self) -> usize {
        self.layer_counts.iter().sum()
    }

    /// Returns the number of neurons in each layer, including bias neurons.
    pub fn layer_counts(&self) -> &[usize] {
        &self.layer_counts
    }

    /// Returns the number of neurons in each layer, excluding bias neurons.
    pub fn layer_feed_counts(&self) -> &[usize] {
        &self.layer_feed_counts
    }

    /// Returns the offset of each layer into the layer output array.
    pub fn layer_index(&self) -> &[usize] {
        &self.layer_index
    }

    /// Returns the offset of the weights feeding each layer into the weight array.
    pub fn weight_index(&self) -> &[usize] {
        &self.weight_index
    }

    /// Returns the activation function of each layer.
    pub fn activations(&self) -> &[Activation] {
        &self.activations
    }

    /// Returns the weights of this network.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Returns a mutable reference to the weights of this network.
    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    /// Replaces all weights of this network.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), Error> {
        if weights.len() != self.weights.len() {
            return Err(Error::WeightCount(self.weights.len(), weights.len()));
        }

        self.weights.copy_from_slice(weights);
        Ok(())
    }

    /// Returns the weight of the connection from neuron `from` of layer `from_layer` to neuron
    /// `to` of the following layer, or `None` if the connection does not exist.
    pub fn weight(&self, from_layer: usize, from: usize, to: usize) -> Option<f64> {
        let to_layer = from_layer + 1;
        if to_layer >= self.layer_count()
            || from >= self.layer_counts[from_layer]
            || to >= self.layer_feed_counts[to_layer]
        {
            return None;
        }

        let index = self.weight_index[to_layer] + to * self.layer_counts[from_layer] + from;
        Some(self.weights[index])
    }

    /// Returns the output of every neuron from the most recent call to
    /// [`evaluate`][Self::evaluate] or [`compute`][Self::compute].
    pub fn layer_output(&self) -> &[f64] {
        self.state.layer_output()
    }
}
