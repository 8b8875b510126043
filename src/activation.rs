//! Handling of neuron activation functions.

use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The derivative offset applied to sigmoid-shaped functions when the flat spot fix is enabled.
const FLAT_SPOT_OFFSET: f64 = 0.1;

/// The slope used by [`Activation::SteepenedSigmoid`].
const STEEPENED_SLOPE: f64 = 4.9;

/// Represents which activation function a layer of a [`FlatNetwork`][crate::FlatNetwork] uses.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Activation {
    /// Identity function. Outputs `x`.
    Linear,
    /// Logistic function. Outputs `1 / (1 + exp(-x))`.
    Sigmoid,
    /// Hyperbolic tangent function. Outputs `tanh(x)`.
    Tanh,
    /// Gaussian bell curve. Outputs `exp(-(x - center)^2 / (2 * width^2))`.
    Gaussian {
        /// The position of the peak.
        center: f64,
        /// The standard deviation of the curve.
        width: f64,
    },
    /// Outputs `sin(x)`.
    Sin,
    /// Logistic function with a slope of 4.9. Outputs `1 / (1 + exp(-4.9x))`.
    SteepenedSigmoid,
    /// Identity function clipped to `[-1, 1]`.
    ClippedLinear,
    /// Outputs `1` for `x > 0`, or `-1` otherwise.
    Bipolar,
    /// Rectified linear unit. Outputs `max(x, 0)`.
    Relu,
    /// Softsign function. Outputs `x / (1 + abs(x))`.
    SoftSign,
}

impl Activation {
    /// Applies the activation function to the input.
    pub fn activate(&self, x: f64) -> f64 {
        match *self {
            Activation::Linear => linear(x),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => tanh(x),
            Activation::Gaussian { center, width } => gaussian(x, center, width),
            Activation::Sin => x.sin(),
            Activation::SteepenedSigmoid => sigmoid(x * STEEPENED_SLOPE),
            Activation::ClippedLinear => clipped_linear(x),
            Activation::Bipolar => bipolar(x),
            Activation::Relu => relu(x),
            Activation::SoftSign => soft_sign(x),
        }
    }

    /// Returns the derivative of the activation function.
    ///
    /// `sum` is the value before activation and `output` is the value after. Each function uses
    /// whichever of the two gives the cheaper form, so both must belong to the same neuron.
    ///
    /// [`Bipolar`][Activation::Bipolar] and [`ClippedLinear`][Activation::ClippedLinear] have no
    /// useful derivative and report `1`.
    pub fn derivative(&self, sum: f64, output: f64) -> f64 {
        match *self {
            Activation::Linear | Activation::ClippedLinear | Activation::Bipolar => 1.0,
            Activation::Sigmoid => output * (1.0 - output),
            Activation::Tanh => 1.0 - output * output,
            Activation::Gaussian { center, width } => {
                -(sum - center) / (width * width) * output
            }
            Activation::Sin => sum.cos(),
            Activation::SteepenedSigmoid => STEEPENED_SLOPE * output * (1.0 - output),
            Activation::Relu => {
                if sum > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::SoftSign => {
                let d = 1.0 + sum.abs();
                1.0 / (d * d)
            }
        }
    }

    /// Returns the constant added to [`derivative`][Self::derivative] when the flat spot fix is
    /// enabled. Sigmoid-shaped functions have a derivative that vanishes as the output saturates,
    /// which stalls training.
    pub fn flat_spot(&self) -> f64 {
        match self {
            Activation::Sigmoid | Activation::SteepenedSigmoid => FLAT_SPOT_OFFSET,
            _ => 0.0,
        }
    }
}

/// Outputs `x`.
pub fn linear<T>(x: T) -> T {
    x
}

/// Logistic function. Outputs `1 / (1 + exp(-x))`.
pub fn sigmoid<T: Float>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

/// Outputs `tanh(x)`.
pub fn tanh<T: Float>(x: T) -> T {
    x.tanh()
}

/// Outputs `exp(-(x - center)^2 / (2 * width^2))`.
pub fn gaussian<T: Float>(x: T, center: T, width: T) -> T {
    let d = x - center;
    let two = T::one() + T::one();
    (-(d * d) / (two * width * width)).exp()
}

/// Outputs `x` clipped to `[-1, 1]`.
pub fn clipped_linear<T: Float>(x: T) -> T {
    x.max(-T::one()).min(T::one())
}

/// Outputs `1` for `x > 0`, or `-1` otherwise.
pub fn bipolar<T: Float>(x: T) -> T {
    if x > T::zero() {
        T::one()
    } else {
        -T::one()
    }
}

/// Rectified linear unit. Outputs `max(0, x)`.
pub fn relu<T: Float>(x: T) -> T {
    x.max(T::zero())
}

/// Outputs `x / (1 + abs(x))`.
pub fn soft_sign<T: Float>(x: T) -> T {
    x / (T::one() + x.abs())
}
