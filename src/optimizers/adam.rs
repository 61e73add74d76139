//! Adam (Adaptive Moment Estimation) optimizer implementation
//!
//! This module provides the Adam optimizer, which combines momentum and
//! adaptive learning rates with bias correction for improved convergence.

use crate::optimizers::{check_lengths, Accumulators, Optimizer};

/// Adam (Adaptive Moment Estimation) optimizer.
///
/// The first moment lives in `gsum` and the second in `xsum`:
///
/// ```text
/// m = β1 * m + (1 - β1) * g
/// v = β2 * v + (1 - β2) * g²
/// m_hat = m / (1 - β1^k)
/// v_hat = v / (1 - β2^k)
/// p = p - lr * m_hat / (sqrt(v_hat) + ε)
/// ```
///
/// `k` is the trainer's iteration counter, so with batches larger than one
/// the bias correction counts steps rather than updates.
///
/// # Reference
///
/// Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
/// arXiv preprint arXiv:1412.6980.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        }
    }
}

impl Optimizer for Adam {
    fn update(&self, k: usize, parameters: &mut [f64], gradients: &[f64], state: &mut Accumulators) {
        check_lengths(parameters, gradients, &state.gsum);
        check_lengths(parameters, gradients, &state.xsum);

        let t = k.max(1) as f64;
        let bias_correction1 = 1.0 - self.beta1.powf(t);
        let bias_correction2 = 1.0 - self.beta2.powf(t);

        for (j, (p, &g)) in parameters.iter_mut().zip(gradients).enumerate() {
            let m = &mut state.gsum[j];
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            let m_hat = *m / bias_correction1;

            let v = &mut state.xsum[j];
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let v_hat = *v / bias_correction2;

            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
