//! Layer descriptions used to build a [`FlatNetwork`][crate::FlatNetwork].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::activation::Activation;

/// A description of one layer of a [`FlatNetwork`][crate::FlatNetwork].
///
/// The activation function of the input layer is never applied.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlatLayer {
    activation: Activation,
    // The number of neurons fed by the previous layer (or by the inputs)
    count: usize,
    // The constant output of this layer's bias neuron, if it has one
    bias: Option<f64>,
}

impl FlatLayer {
    /// Returns a new `FlatLayer` of `count` neurons without a bias neuron.
    pub fn new(activation: Activation, count: usize) -> Self {
        Self {
            activation,
            count,
            bias: None,
        }
    }

    /// Adds a bias neuron that always outputs `value`.
    pub fn with_bias(mut self, value: f64) -> Self {
        self.bias = Some(value);
        self
    }

    /// Returns the activation function of this layer.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Returns the number of neurons in this layer, excluding the bias neuron.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the output of the bias neuron if this layer has one.
    pub fn bias(&self) -> Option<f64> {
        self.bias
    }

    /// Returns the number of neurons in this layer, including the bias neuron.
    pub fn total_count(&self) -> usize {
        if self.bias.is_some() {
            self.count + 1
        } else {
            self.count
        }
    }
}
