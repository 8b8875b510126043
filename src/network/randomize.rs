//! Weight initialization.

use rand::Rng;

use super::FlatNetwork;

/// The range of the initial weights before Nguyen-Widrow scaling.
const NGUYEN_WIDROW_RANGE: f64 = 0.5;

impl FlatNetwork {
    /// Sets every weight to a uniformly random value in `[low, high)`.
    ///
    /// # Panics
    ///
    /// Panics if `low >= high`, or if either bound is not finite.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, low: f64, high: f64) {
        for weight in &mut self.weights {
            *weight = rng.gen_range(low..high);
        }
    }

    /// Initializes the weights using the Nguyen-Widrow method, which spreads the active regions
    /// of each layer's neurons evenly over its input space.
    ///
    /// Bias weights are drawn from `[-beta, beta)`, where `beta` is the layer's scale factor.
    pub fn nguyen_widrow<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for to_layer in 1..self.layer_count() {
            let from_total = self.layer_counts[to_layer - 1];
            let from_count = self.layer_feed_counts[to_layer - 1];
            let to_count = self.layer_feed_counts[to_layer];
            let beta = 0.7 * (to_count as f64).powf(1.0 / from_count as f64);

            let start = self.weight_index[to_layer];
            let end = start + from_total * to_count;
            for row in self.weights[start..end].chunks_exact_mut(from_total) {
                let (weights, bias) = row.split_at_mut(from_count);

                for weight in weights.iter_mut() {
                    *weight = rng.gen_range(-NGUYEN_WIDROW_RANGE..NGUYEN_WIDROW_RANGE);
                }

                let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for weight in weights.iter_mut() {
                        *weight *= beta / norm;
                    }
                }

                for weight in bias {
                    *weight = rng.gen_range(-beta..beta);
                }
            }
        }
    }
}
