//! Adaptive per-parameter learning rates from squared-gradient history

use crate::optimizers::{check_lengths, Accumulators, Optimizer};

/// Adagrad: divides each step by the root of the summed squared gradients.
///
/// ```text
/// gsum = gsum + g²
/// p = p - lr * g / sqrt(gsum + eps)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adagrad {
    learning_rate: f64,
    epsilon: f64,
}

impl Adagrad {
    pub fn new(learning_rate: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            epsilon,
        }
    }
}

impl Optimizer for Adagrad {
    fn update(&self, _k: usize, parameters: &mut [f64], gradients: &[f64], state: &mut Accumulators) {
        check_lengths(parameters, gradients, &state.gsum);
        for ((p, &g), gsum) in parameters.iter_mut().zip(gradients).zip(state.gsum.iter_mut()) {
            *gsum += g * g;
            *p -= self.learning_rate * g / (*gsum + self.epsilon).sqrt();
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

/// Windowgrad: Adagrad over an exponentially decaying window, so the
/// effective rate does not shrink forever.
///
/// ```text
/// gsum = rho * gsum + (1 - rho) * g²
/// p = p - lr * g / sqrt(gsum + eps)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Windowgrad {
    learning_rate: f64,
    rho: f64,
    epsilon: f64,
}

impl Windowgrad {
    pub fn new(learning_rate: f64, rho: f64, epsilon: f64) -> Self {
        Self {
            learning_rate,
            rho,
            epsilon,
        }
    }
}

impl Optimizer for Windowgrad {
    fn update(&self, _k: usize, parameters: &mut [f64], gradients: &[f64], state: &mut Accumulators) {
        check_lengths(parameters, gradients, &state.gsum);
        for ((p, &g), gsum) in parameters.iter_mut().zip(gradients).zip(state.gsum.iter_mut()) {
            *gsum = self.rho * *gsum + (1.0 - self.rho) * g * g;
            *p -= self.learning_rate * g / (*gsum + self.epsilon).sqrt();
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
