//! Adadelta optimizer implementation

use crate::optimizers::{check_lengths, Accumulators, Optimizer};

/// Adadelta: scales each step by the ratio of recent update magnitudes to
/// recent gradient magnitudes, so no learning rate is needed.
///
/// ```text
/// gsum = rho * gsum + (1 - rho) * g²
/// dx = -sqrt(xsum + eps) / sqrt(gsum + eps) * g
/// xsum = rho * xsum + (1 - rho) * dx²
/// p = p + dx
/// ```
///
/// # Reference
///
/// Zeiler, M. D. (2012). ADADELTA: An adaptive learning rate method.
/// arXiv preprint arXiv:1212.5701.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adadelta {
    rho: f64,
    epsilon: f64,
}

impl Adadelta {
    pub fn new(rho: f64, epsilon: f64) -> Self {
        Self { rho, epsilon }
    }
}

impl Optimizer for Adadelta {
    fn update(&self, _k: usize, parameters: &mut [f64], gradients: &[f64], state: &mut Accumulators) {
        check_lengths(parameters, gradients, &state.gsum);
        check_lengths(parameters, gradients, &state.xsum);

        for (j, (p, &g)) in parameters.iter_mut().zip(gradients).enumerate() {
            let gsum = &mut state.gsum[j];
            *gsum = self.rho * *gsum + (1.0 - self.rho) * g * g;

            let xsum = &mut state.xsum[j];
            let dx = -((*xsum + self.epsilon).sqrt() / (state.gsum[j] + self.epsilon).sqrt()) * g;
            *xsum = self.rho * *xsum + (1.0 - self.rho) * dx * dx;

            *p += dx;
        }
    }

    /// Adadelta has no learning rate; reported as 1.0.
    fn learning_rate(&self) -> f64 {
        1.0
    }
}
