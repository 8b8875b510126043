//! The error type for creation and evaluation of networks.

use std::{error, fmt};

/// The reason why a network could not be built or evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Fewer than two layers were given.
    TooFewLayers,
    /// A layer has no neurons. Contains the index of the layer.
    EmptyLayer(usize),
    /// The output layer was given a bias neuron.
    OutputBias,
    /// The layer tables of a network are inconsistent with each other.
    InvalidLayout,
    /// An input vector does not match the network's input count. Contains the expected and
    /// actual lengths.
    InvalidInputSize(usize, usize),
    /// An output buffer does not match the network's output count. Contains the expected and
    /// actual lengths.
    InvalidOutputSize(usize, usize),
    /// An ideal vector does not match the network's output count. Contains the expected and
    /// actual lengths.
    InvalidIdealSize(usize, usize),
    /// A weight vector does not match the network's weight count. Contains the expected and
    /// actual lengths.
    WeightCount(usize, usize),
    /// An error was calculated before any samples were accumulated.
    NoSamples,
    /// A training record was requested past the end of a data set. Contains the index and the
    /// length of the data set.
    RecordOutOfRange(usize, usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::TooFewLayers => write!(f, "a network needs at least two layers"),
            Self::EmptyLayer(index) => write!(f, "layer {} has no neurons", index),
            Self::OutputBias => write!(f, "the output layer cannot have a bias neuron"),
            Self::InvalidLayout => write!(f, "the layer tables of the network are inconsistent"),
            Self::InvalidInputSize(expected, actual) => write!(
                f,
                "invalid input size: expected {}, got {}",
                expected, actual
            ),
            Self::InvalidOutputSize(expected, actual) => write!(
                f,
                "invalid output size: expected {}, got {}",
                expected, actual
            ),
            Self::InvalidIdealSize(expected, actual) => write!(
                f,
                "invalid ideal size: expected {}, got {}",
                expected, actual
            ),
            Self::WeightCount(expected, actual) => write!(
                f,
                "invalid weight count: expected {}, got {}",
                expected, actual
            ),
            Self::NoSamples => write!(f, "no samples were accumulated"),
            Self::RecordOutOfRange(index, len) => write!(
                f,
                "record {} is out of range for a data set of length {}",
                index, len
            ),
        }
    }
}

impl error::Error for Error {}
