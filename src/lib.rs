//! Feed-forward neural networks stored as flat arrays, with gradients computed in parallel over
//! partitions of a training set.
//!
//! A [`FlatNetwork`] keeps every neuron output and every weight in contiguous arrays addressed
//! through per-layer offset tables. Training splits the data set between gradient workers that
//! share the network read-only, then sums their gradients and errors. The summed gradients feed
//! an update rule, and the same backward sweep fills the Jacobian used by Levenberg-Marquardt.
//!
//! # Examples
//!
//! ```
//! use flatprop::train::{self, Propagation, ResilientPropagation, RpropVariant, StopCondition};
//! use flatprop::{Activation, FlatNetwork};
//! use rand::SeedableRng;
//!
//! let xor = [
//!     ([0.0, 0.0], [0.0]),
//!     ([0.0, 1.0], [1.0]),
//!     ([1.0, 0.0], [1.0]),
//!     ([1.0, 1.0], [0.0]),
//! ];
//!
//! // 2 inputs, one hidden layer of 4 neurons, 1 output
//! let mut network =
//!     FlatNetwork::with_hidden(2, &[4], 1, Activation::Sigmoid, Activation::Sigmoid).unwrap();
//! network.nguyen_widrow(&mut rand::rngs::StdRng::seed_from_u64(0));
//!
//! let rule = ResilientPropagation::new(RpropVariant::Plus);
//! let mut trainer = Propagation::new(network, &xor[..], rule).unwrap();
//! train::train(&mut trainer, StopCondition::Iterations(100)).unwrap();
//!
//! let mut network = trainer.into_network();
//! let output = network.evaluate(&[1.0, 0.0]).unwrap();
//! assert_eq!(1, output.len());
//! ```

// Numerical kernels do not check for NaN or infinite values. They propagate through the outputs
// and errors like any other value.

pub mod activation;
pub mod data;
pub mod error_calculation;
pub mod network;
pub mod train;

pub use activation::Activation;
pub use data::{BasicDataSet, DataPair, DataSet};
pub use error_calculation::{ErrorCalculation, ErrorMode};
pub use network::{FlatLayer, FlatNetwork};
