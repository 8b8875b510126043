//! Rules that turn an epoch's gradients into weight changes.

/// Gradients smaller than this are treated as zero by sign-based rules.
const ZERO_TOLERANCE: f64 = 1e-17;

/// Applies the gradients of one epoch to a network's weights.
///
/// Gradients are descent directions (see
/// [`GradientCalculator::gradients`][super::GradientCalculator::gradients]), so rules move the
/// weights along them.
pub trait UpdateRule {
    /// Updates `weights` in place from `gradients`. Both slices have one element per weight.
    fn update(&mut self, gradients: &[f64], weights: &mut [f64]);
}

/// Gradient descent with momentum.
#[derive(Clone, Debug, PartialEq)]
pub struct Backpropagation {
    learning_rate: f64,
    momentum: f64,
    last_delta: Vec<f64>,
}

impl Backpropagation {
    /// Returns a new `Backpropagation` rule.
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            last_delta: Vec::new(),
        }
    }

    /// Returns the learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Sets the learning rate.
    pub fn set_learning_rate(&mut self, rate: f64) {
        self.learning_rate = rate;
    }

    /// Returns the momentum.
    pub fn momentum(&self) -> f64 {
        self.momentum
    }
}

impl UpdateRule for Backpropagation {
    fn update(&mut self, gradients: &[f64], weights: &mut [f64]) {
        self.last_delta.resize(weights.len(), 0.0);

        for ((weight, gradient), last) in weights
            .iter_mut()
            .zip(gradients)
            .zip(&mut self.last_delta)
        {
            let delta = gradient * self.learning_rate + *last * self.momentum;
            *last = delta;
            *weight += delta;
        }
    }
}

/// Moves every weight by a fixed step in the direction of its gradient, ignoring the gradient's
/// magnitude.
#[derive(Clone, Debug, PartialEq)]
pub struct ManhattanPropagation {
    learning_rate: f64,
}

impl ManhattanPropagation {
    /// Returns a new `ManhattanPropagation` rule that moves weights by `learning_rate`.
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl UpdateRule for ManhattanPropagation {
    fn update(&mut self, gradients: &[f64], weights: &mut [f64]) {
        for (weight, &gradient) in weights.iter_mut().zip(gradients) {
            *weight += sign(gradient) * self.learning_rate;
        }
    }
}

/// The flavor of [`ResilientPropagation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpropVariant {
    /// Classic RPROP with weight backtracking: a gradient sign change undoes the previous step.
    Plus,
    /// Improved RPROP without backtracking: a gradient sign change skips the step.
    IMinus,
}

/// Resilient propagation. Each weight has its own step size, which grows while the gradient keeps
/// its sign and shrinks when it flips.
#[derive(Clone, Debug, PartialEq)]
pub struct ResilientPropagation {
    variant: RpropVariant,
    initial_update: f64,
    max_step: f64,
    update_values: Vec<f64>,
    last_gradients: Vec<f64>,
    last_weight_changes: Vec<f64>,
}

impl ResilientPropagation {
    /// The factor a step grows by while the gradient keeps its sign.
    pub const POSITIVE_ETA: f64 = 1.2;
    /// The factor a step shrinks by when the gradient changes sign.
    pub const NEGATIVE_ETA: f64 = 0.5;
    /// The smallest step size.
    pub const DELTA_MIN: f64 = 1e-6;
    /// The default initial step size.
    pub const DEFAULT_INITIAL_UPDATE: f64 = 0.1;
    /// The default largest step size.
    pub const DEFAULT_MAX_STEP: f64 = 50.0;

    /// Returns a new `ResilientPropagation` rule with the default step sizes.
    pub fn new(variant: RpropVariant) -> Self {
        Self {
            variant,
            initial_update: Self::DEFAULT_INITIAL_UPDATE,
            max_step: Self::DEFAULT_MAX_STEP,
            update_values: Vec::new(),
            last_gradients: Vec::new(),
            last_weight_changes: Vec::new(),
        }
    }

    /// Sets the step size every weight starts with.
    pub fn initial_update(mut self, value: f64) -> Self {
        self.initial_update = value;
        self
    }

    /// Sets the largest step size.
    pub fn max_step(mut self, value: f64) -> Self {
        self.max_step = value;
        self
    }

    /// Returns the current step size of every weight.
    pub fn update_values(&self) -> &[f64] {
        &self.update_values
    }

    fn resize(&mut self, len: usize) {
        if self.update_values.len() != len {
            self.update_values = vec![self.initial_update; len];
            self.last_gradients = vec![0.0; len];
            self.last_weight_changes = vec![0.0; len];
        }
    }

    /// Returns the change for weight `i`, updating its step size and stored gradient.
    fn weight_change(&mut self, i: usize, gradient: f64) -> f64 {
        let change = sign(gradient * self.last_gradients[i]);

        if change > 0.0 {
            let delta = (self.update_values[i] * Self::POSITIVE_ETA).min(self.max_step);
            self.update_values[i] = delta;
            self.last_gradients[i] = gradient;
            sign(gradient) * delta
        } else if change < 0.0 {
            self.update_values[i] = (self.update_values[i] * Self::NEGATIVE_ETA).max(Self::DELTA_MIN);
            self.last_gradients[i] = 0.0;
            match self.variant {
                RpropVariant::Plus => -self.last_weight_changes[i],
                RpropVariant::IMinus => 0.0,
            }
        } else {
            self.last_gradients[i] = gradient;
            sign(gradient) * self.update_values[i]
        }
    }
}

impl UpdateRule for ResilientPropagation {
    fn update(&mut self, gradients: &[f64], weights: &mut [f64]) {
        self.resize(weights.len());

        for (i, (weight, &gradient)) in weights.iter_mut().zip(gradients).enumerate() {
            let change = self.weight_change(i, gradient);
            self.last_weight_changes[i] = change;
            *weight += change;
        }
    }
}

/// Returns the sign of `x`, treating values within [`ZERO_TOLERANCE`] of zero as zero.
fn sign(x: f64) -> f64 {
    if x.abs() < ZERO_TOLERANCE {
        0.0
    } else if x > 0.0 {
        1.0
    } else {
        -1.0
    }
}
