//! Configuration structures for training
//!
//! This module provides the trainer's hyperparameters, loadable from JSON with
//! documented defaults for every omitted field.

use crate::error::{Error, Result};
use crate::optimizers::Method;
use serde::{Deserialize, Serialize};
use std::fs;

/// Hyperparameters of a [`crate::Trainer`].
///
/// Fields a method does not use are ignored by it (e.g. `rho` for Adam).
///
/// # Example
///
/// ```json
/// {
///   "method": "adam",
///   "learning_rate": 0.001,
///   "batch_size": 8,
///   "l2_decay": 0.0001
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerOptions {
    /// Update rule (default `sgd`)
    pub method: Method,
    /// Step size (default 0.01)
    pub learning_rate: f64,
    /// Steps whose gradients are summed before one update (default 1)
    pub batch_size: usize,
    /// Velocity retention for `sgd` and `nesterov` (default 0.9)
    pub momentum: f64,
    /// Window decay for `windowgrad` and `adadelta` (default 0.95)
    pub rho: f64,
    /// Numerical floor inside square roots (default 1e-8)
    pub eps: f64,
    /// First moment decay for `adam` (default 0.9)
    pub beta1: f64,
    /// Second moment decay for `adam` (default 0.999)
    pub beta2: f64,
    /// L1 weight decay coefficient (default 0.0)
    pub l1_decay: f64,
    /// L2 weight decay coefficient (default 0.0)
    pub l2_decay: f64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            method: Method::Sgd,
            learning_rate: 0.01,
            batch_size: 1,
            momentum: 0.9,
            rho: 0.95,
            eps: 1e-8,
            beta1: 0.9,
            beta2: 0.999,
            l1_decay: 0.0,
            l2_decay: 0.0,
        }
    }
}

impl TrainerOptions {
    /// Default options for `method`.
    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Checks every hyperparameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Options`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::options("batch_size must be at least 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(Error::options(format!(
                "learning_rate must be finite and non-negative, got {}",
                self.learning_rate
            )));
        }
        if self.eps.is_nan() || self.eps <= 0.0 {
            return Err(Error::options(format!("eps must be positive, got {}", self.eps)));
        }

        for (name, value) in [("momentum", self.momentum), ("rho", self.rho)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::options(format!(
                    "{} must be in range [0.0, 1.0], got {}",
                    name, value
                )));
            }
        }

        // Adam divides by 1 - beta^k
        for (name, value) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&value) {
                return Err(Error::options(format!(
                    "{} must be in range [0.0, 1.0), got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [("l1_decay", self.l1_decay), ("l2_decay", self.l2_decay)] {
            if value.is_nan() || value < 0.0 {
                return Err(Error::options(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Loads trainer options from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use reticulum::config::load_trainer_options;
///
/// let options = load_trainer_options("config/trainer_adam.json").unwrap();
/// assert_eq!(options.method.to_string(), "adam");
/// ```
pub fn load_trainer_options(path: &str) -> Result<TrainerOptions> {
    let contents = fs::read_to_string(path)?;
    let options: TrainerOptions = serde_json::from_str(&contents)?;
    options.validate()?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TrainerOptions::default();
        assert_eq!(options.method, Method::Sgd);
        assert_eq!(options.learning_rate, 0.01);
        assert_eq!(options.batch_size, 1);
        assert_eq!(options.momentum, 0.9);
        assert_eq!(options.rho, 0.95);
        assert_eq!(options.eps, 1e-8);
        assert_eq!(options.beta1, 0.9);
        assert_eq!(options.beta2, 0.999);
        assert_eq!(options.l1_decay, 0.0);
        assert_eq!(options.l2_decay, 0.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: TrainerOptions =
            serde_json::from_str(r#"{ "method": "windowgrad", "batch_size": 4 }"#).unwrap();
        assert_eq!(options.method, Method::Windowgrad);
        assert_eq!(options.batch_size, 4);
        assert_eq!(options.learning_rate, 0.01);
        assert_eq!(options.rho, 0.95);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            TrainerOptions {
                batch_size: 0,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                learning_rate: f64::NAN,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                learning_rate: -0.1,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                eps: 0.0,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                momentum: 1.5,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                beta2: -0.1,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                beta1: 1.0,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                beta2: 1.0,
                ..TrainerOptions::default()
            },
            TrainerOptions {
                l2_decay: -1.0,
                ..TrainerOptions::default()
            },
        ];
        for options in cases {
            assert!(
                matches!(options.validate(), Err(Error::Options(_))),
                "accepted {:?}",
                options
            );
        }
    }

    #[test]
    fn test_load_trainer_options() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let json_content = r#"{
  "method": "adam",
  "learning_rate": 0.001,
  "l2_decay": 0.0001
}"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let temp_path = temp_file.path().to_str().unwrap();

        let options = load_trainer_options(temp_path).unwrap();
        assert_eq!(options.method, Method::Adam);
        assert_eq!(options.learning_rate, 0.001);
        assert_eq!(options.l2_decay, 0.0001);
        assert_eq!(options.batch_size, 1);
    }

    #[test]
    fn test_load_trainer_options_invalid() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"{ "batch_size": 0 }"#)
            .unwrap();
        let result = load_trainer_options(temp_file.path().to_str().unwrap());
        assert!(matches!(result, Err(Error::Options(_))));

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"{ not json").unwrap();
        let result = load_trainer_options(temp_file.path().to_str().unwrap());
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
