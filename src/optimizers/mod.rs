//! Optimizer abstractions for parameter updates
//!
//! An optimizer turns the (already decayed and batch-averaged) gradient of one
//! parameter group into an in-place update of its weights. Optimizers carry
//! only hyperparameters: the per-parameter history they need lives in an
//! [`Accumulators`] owned by the trainer, one per parameter group.
//!
//! # Available Optimizers
//!
//! - [`Sgd`]: gradient descent with momentum
//! - [`Nesterov`]: Nesterov accelerated momentum
//! - [`Adagrad`]: per-parameter rates from the sum of squared gradients
//! - [`Windowgrad`]: Adagrad over a decaying window
//! - [`Adadelta`]: learning-rate-free adaptive updates
//! - [`Adam`]: bias-corrected first and second moment estimates

pub mod adadelta;
pub mod adagrad;
pub mod adam;
pub mod sgd;

pub use adadelta::Adadelta;
pub use adagrad::{Adagrad, Windowgrad};
pub use adam::Adam;
pub use sgd::{Nesterov, Sgd};

use crate::config::TrainerOptions;
use serde::{Deserialize, Serialize};

/// Update rule selected by the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Sgd,
    Adagrad,
    Windowgrad,
    Adadelta,
    Adam,
    Nesterov,
}

impl Method {
    /// Whether the rule keeps a second history buffer next to `gsum`.
    pub fn uses_xsum(self) -> bool {
        matches!(self, Method::Adadelta | Method::Adam)
    }

    /// Instantiates the rule with the hyperparameters from `options`.
    pub fn optimizer(self, options: &TrainerOptions) -> Box<dyn Optimizer> {
        let lr = options.learning_rate;
        match self {
            Method::Sgd => Box::new(Sgd::new(lr, options.momentum)),
            Method::Nesterov => Box::new(Nesterov::new(lr, options.momentum)),
            Method::Adagrad => Box::new(Adagrad::new(lr, options.eps)),
            Method::Windowgrad => Box::new(Windowgrad::new(lr, options.rho, options.eps)),
            Method::Adadelta => Box::new(Adadelta::new(options.rho, options.eps)),
            Method::Adam => Box::new(Adam::new(lr, options.beta1, options.beta2, options.eps)),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Sgd => "sgd",
            Method::Adagrad => "adagrad",
            Method::Windowgrad => "windowgrad",
            Method::Adadelta => "adadelta",
            Method::Adam => "adam",
            Method::Nesterov => "nesterov",
        };
        f.write_str(name)
    }
}

/// Per-parameter optimizer history for one parameter group.
///
/// `gsum` holds the velocity for the momentum rules, the squared-gradient
/// history for the adaptive rules and the first moment for Adam. `xsum` is
/// only allocated for Adadelta (squared updates) and Adam (second moment).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulators {
    pub gsum: Vec<f64>,
    pub xsum: Vec<f64>,
}

impl Accumulators {
    pub fn new(len: usize, method: Method) -> Self {
        Self {
            gsum: vec![0.0; len],
            xsum: if method.uses_xsum() {
                vec![0.0; len]
            } else {
                Vec::new()
            },
        }
    }
}

/// Core trait for update rules.
pub trait Optimizer {
    /// Updates `parameters` in place from `gradients`.
    ///
    /// `k` is the trainer's iteration counter at the time of the update (≥ 1).
    ///
    /// # Panics
    ///
    /// Panics if `parameters`, `gradients` and the used accumulators differ in length.
    fn update(&self, k: usize, parameters: &mut [f64], gradients: &[f64], state: &mut Accumulators);

    /// Base learning rate; adaptive rules scale it per parameter.
    fn learning_rate(&self) -> f64;
}

pub(crate) fn check_lengths(parameters: &[f64], gradients: &[f64], history: &[f64]) {
    assert_eq!(
        parameters.len(),
        gradients.len(),
        "Parameters and gradients must have the same length"
    );
    assert_eq!(
        parameters.len(),
        history.len(),
        "Parameters and accumulators must have the same length"
    );
}
