//! The error type for training.

use std::{error, fmt};

use crate::network;

/// An error while computing gradients or training a network.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// An error from the network or the data set.
    Network(network::Error),
    /// The training data set has no records.
    EmptyTrainingSet,
    /// The network's input count does not match the data set. Contains the network's input count
    /// and the data set's input size.
    InputSizeMismatch(usize, usize),
    /// The network's output count does not match the data set. Contains the network's output
    /// count and the data set's ideal size.
    IdealSizeMismatch(usize, usize),
    /// A network with a different layout was given than the one the trainer was built for.
    NetworkMismatch,
    /// A data set with a different number of records was given than the one the trainer was
    /// partitioned for. Contains the expected and actual record counts.
    DataMismatch(usize, usize),
    /// A gradient worker failed. Contains the index of the worker and the cause.
    WorkerFailure(usize, Box<Error>),
    /// A gradient worker panicked. Contains the index of the worker and the panic message.
    WorkerPanic(usize, String),
    /// The Jacobian can only be computed for networks with one output. Contains the output
    /// count.
    UnsupportedOutputCount(usize),
    /// Levenberg-Marquardt damping grew past its limit without finding a step that lowers the
    /// error. Contains the final damping value.
    DampingExhausted(f64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::EmptyTrainingSet => write!(f, "the training set is empty"),
            Self::InputSizeMismatch(network, data) => write!(
                f,
                "network takes {} inputs but the training set has {}",
                network, data
            ),
            Self::IdealSizeMismatch(network, data) => write!(
                f,
                "network produces {} outputs but the training set has {}",
                network, data
            ),
            Self::NetworkMismatch => {
                write!(f, "the network does not match the trainer's network layout")
            }
            Self::DataMismatch(expected, actual) => write!(
                f,
                "the trainer was built for {} records but the training set has {}",
                expected, actual
            ),
            Self::WorkerFailure(index, e) => write!(f, "worker {} failed: {}", index, e),
            Self::WorkerPanic(index, message) => {
                write!(f, "worker {} panicked: {}", index, message)
            }
            Self::UnsupportedOutputCount(count) => write!(
                f,
                "the Jacobian requires a single output, the network has {}",
                count
            ),
            Self::DampingExhausted(lambda) => {
                write!(f, "damping reached {} without reducing the error", lambda)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Network(e) => Some(e),
            Self::WorkerFailure(_, e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<network::Error> for Error {
    fn from(e: network::Error) -> Self {
        Self::Network(e)
    }
}
