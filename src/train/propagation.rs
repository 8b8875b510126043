//! Batch training with an update rule applied to parallel gradients.

use super::gradient::GradientCalculator;
use super::update::UpdateRule;
use super::{Error, Train};
use crate::data::DataSet;
use crate::network::FlatNetwork;

/// Trains a network by running one [`GradientCalculator`] epoch per iteration and handing the
/// summed gradients to an [`UpdateRule`].
///
/// The weights are only written after every worker of the epoch has finished, so the update rule
/// is the only writer and the workers always see one consistent set of weights.
#[derive(Debug)]
pub struct Propagation<'a, D: DataSet + ?Sized, R: UpdateRule> {
    network: FlatNetwork,
    data: &'a D,
    rule: R,
    // Rebuilt lazily after a setting that affects the partitioning changes
    calculator: Option<GradientCalculator>,
    worker_count: usize,
    fix_flat_spot: bool,
    error: f64,
    iterations: usize,
}

impl<'a, D: DataSet + ?Sized, R: UpdateRule> Propagation<'a, D, R> {
    /// Returns a new trainer for `network` over `data`.
    ///
    /// Uses one worker per rayon thread and no flat spot fix. Returns an error if `data` is
    /// empty or does not match the network.
    pub fn new(network: FlatNetwork, data: &'a D, rule: R) -> Result<Self, Error> {
        let calculator = GradientCalculator::new(&network, data, 0, false)?;

        Ok(Self {
            network,
            data,
            rule,
            calculator: Some(calculator),
            worker_count: 0,
            fix_flat_spot: false,
            error: 0.0,
            iterations: 0,
        })
    }

    /// Sets the number of gradient workers. Zero uses one worker per rayon thread.
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self.calculator = None;
        self
    }

    /// Sets whether a constant is added to sigmoid-shaped derivatives so that saturated neurons
    /// keep learning.
    pub fn fix_flat_spot(mut self, fix: bool) -> Self {
        self.fix_flat_spot = fix;
        self.calculator = None;
        self
    }

    /// Returns the update rule.
    pub fn rule(&self) -> &R {
        &self.rule
    }

    /// Returns the update rule mutably, for example to change a learning rate between
    /// iterations.
    pub fn rule_mut(&mut self) -> &mut R {
        &mut self.rule
    }

    /// Returns the gradients of the last iteration, or `None` before the first one.
    pub fn gradients(&self) -> Option<&[f64]> {
        self.calculator
            .as_ref()
            .filter(|_| self.iterations > 0)
            .map(GradientCalculator::gradients)
    }

    /// Consumes the trainer, returning the trained network.
    pub fn into_network(self) -> FlatNetwork {
        self.network
    }
}

impl<'a, D: DataSet + ?Sized, R: UpdateRule> Train for Propagation<'a, D, R> {
    /// Runs one epoch and updates the weights. Returns the error of the network before the
    /// update.
    fn iteration(&mut self) -> Result<f64, Error> {
        let mut calculator = match self.calculator.take() {
            Some(calculator) => calculator,
            None => GradientCalculator::new(
                &self.network,
                self.data,
                self.worker_count,
                self.fix_flat_spot,
            )?,
        };

        let result = calculator.run_epoch(&self.network, self.data);
        if result.is_ok() {
            self.rule
                .update(calculator.gradients(), self.network.weights_mut());
            self.iterations += 1;
        }
        self.calculator = Some(calculator);

        self.error = result?;
        Ok(self.error)
    }

    fn error(&self) -> f64 {
        self.error
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn network(&self) -> &FlatNetwork {
        &self.network
    }
}
