//! Parallel gradient computation over a whole training set.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

use log::debug;
use rayon::prelude::*;

use super::worker::GradientWorker;
use super::Error;
use crate::data::DataSet;
use crate::error_calculation::ErrorCalculation;
use crate::network::FlatNetwork;

/// Splits `0..len` into `workers` contiguous ranges of near-equal size. The last range absorbs
/// the remainder.
///
/// `workers` is clamped to `1..=len`. An empty `len` gives a single empty range.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.clamp(1, len.max(1));
    let size = len / workers;

    (0..workers)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == workers { len } else { start + size };
            start..end
        })
        .collect()
}

/// Computes the gradients and error of a network over a training set, one epoch at a time.
///
/// The training set is partitioned once, and each partition gets its own [`GradientWorker`].
/// [`run_epoch`][Self::run_epoch] runs every worker in parallel against the same network, waits
/// for all of them, and sums their results. The network is borrowed immutably for the duration,
/// so weights can only be changed between epochs.
#[derive(Clone, Debug)]
pub struct GradientCalculator {
    workers: Vec<GradientWorker>,
    // The sum of every worker's gradients
    gradients: Vec<f64>,
    errors: ErrorCalculation,
    error: f64,
    // The layout the workers' buffers were sized for
    layer_counts: Vec<usize>,
    // The number of records the partitions cover
    record_count: usize,
}

impl GradientCalculator {
    /// Returns a new `GradientCalculator` that splits `data` between `worker_count` workers.
    ///
    /// A `worker_count` of zero uses one worker per thread in the rayon pool. The count is never
    /// larger than the number of records.
    pub fn new<D: DataSet + ?Sized>(
        network: &FlatNetwork,
        data: &D,
        worker_count: usize,
        fix_flat_spot: bool,
    ) -> Result<Self, Error> {
        if data.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }
        if network.input_count() != data.input_size() {
            return Err(Error::InputSizeMismatch(
                network.input_count(),
                data.input_size(),
            ));
        }
        if network.output_count() != data.ideal_size() {
            return Err(Error::IdealSizeMismatch(
                network.output_count(),
                data.ideal_size(),
            ));
        }

        let worker_count = if worker_count == 0 {
            rayon::current_num_threads()
        } else {
            worker_count
        };
        let workers = partition(data.len(), worker_count)
            .into_iter()
            .map(|range| GradientWorker::new(network, range, fix_flat_spot))
            .collect::<Vec<_>>();

        debug!(
            "partitioned {} records between {} gradient workers",
            data.len(),
            workers.len()
        );

        Ok(Self {
            workers,
            gradients: vec![0.0; network.weights().len()],
            errors: ErrorCalculation::new(),
            error: 0.0,
            layer_counts: network.layer_counts().to_vec(),
            record_count: data.len(),
        })
    }

    /// Runs every worker over its partition and sums the results, returning the error of the
    /// epoch.
    ///
    /// `data` must have the same number of records as the data set this calculator was built
    /// for. If any worker fails, the whole epoch fails and the gradients from the previous epoch
    /// are left in place.
    pub fn run_epoch<D: DataSet + ?Sized>(
        &mut self,
        network: &FlatNetwork,
        data: &D,
    ) -> Result<f64, Error> {
        if network.layer_counts() != self.layer_counts.as_slice()
            || network.weights().len() != self.gradients.len()
        {
            return Err(Error::NetworkMismatch);
        }
        if data.len() != self.record_count {
            return Err(Error::DataMismatch(self.record_count, data.len()));
        }

        let results = self
            .workers
            .par_iter_mut()
            .map(|worker| panic::catch_unwind(AssertUnwindSafe(|| worker.run(network, data))))
            .collect::<Vec<_>>();

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(Error::WorkerFailure(index, Box::new(e.into()))),
                Err(payload) => return Err(Error::WorkerPanic(index, panic_message(payload))),
            }
        }

        self.gradients.iter_mut().for_each(|g| *g = 0.0);
        self.errors.reset();
        for worker in &self.workers {
            for (total, g) in self.gradients.iter_mut().zip(worker.gradients()) {
                *total += g;
            }
            self.errors.merge(worker.errors());
        }
        self.error = self.errors.calculate()?;

        Ok(self.error)
    }

    /// Returns the summed gradients of the last successful epoch.
    ///
    /// Each gradient is the descent direction of half the sum of squared errors over the training
    /// set, so adding a positive multiple of it to the weights lowers the error.
    pub fn gradients(&self) -> &[f64] {
        &self.gradients
    }

    /// Returns the RMS error of the last successful epoch.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Returns the summed error accumulator of the last successful epoch.
    pub fn errors(&self) -> &ErrorCalculation {
        &self.errors
    }

    /// Returns the workers, in partition order.
    pub fn workers(&self) -> &[GradientWorker] {
        &self.workers
    }
}

/// Extracts the message from a panic payload.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
