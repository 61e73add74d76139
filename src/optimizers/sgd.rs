//! Momentum-based gradient descent
//!
//! Both rules keep a velocity per parameter in `gsum`.

use crate::optimizers::{check_lengths, Accumulators, Optimizer};

/// Stochastic gradient descent with momentum.
///
/// ```text
/// v = momentum * v - lr * g
/// p = p + v
/// ```
///
/// With `momentum = 0` this is vanilla gradient descent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    learning_rate: f64,
    momentum: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
        }
    }
}

impl Optimizer for Sgd {
    fn update(&self, _k: usize, parameters: &mut [f64], gradients: &[f64], state: &mut Accumulators) {
        check_lengths(parameters, gradients, &state.gsum);
        for ((p, &g), v) in parameters.iter_mut().zip(gradients).zip(state.gsum.iter_mut()) {
            *v = self.momentum * *v - self.learning_rate * g;
            *p += *v;
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

/// Nesterov accelerated gradient.
///
/// ```text
/// v_prev = v
/// v = momentum * v - lr * g
/// p = p - momentum * v_prev + (1 + momentum) * v
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nesterov {
    learning_rate: f64,
    momentum: f64,
}

impl Nesterov {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
        }
    }
}

impl Optimizer for Nesterov {
    fn update(&self, _k: usize, parameters: &mut [f64], gradients: &[f64], state: &mut Accumulators) {
        check_lengths(parameters, gradients, &state.gsum);
        for ((p, &g), v) in parameters.iter_mut().zip(gradients).zip(state.gsum.iter_mut()) {
            let v_prev = *v;
            *v = self.momentum * *v - self.learning_rate * g;
            *p += -self.momentum * v_prev + (1.0 + self.momentum) * *v;
        }
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
