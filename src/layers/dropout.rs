//! Dropout layer implementation for regularization
//!
//! During training each element is independently zeroed with probability
//! `drop_prob` and the dropped positions are remembered for the backward pass.
//! During inference every element is scaled by `drop_prob` instead.

use crate::error::{Error, Result};
use crate::layers::{cached, Layer, LayerKind, ParamGroup};
use crate::utils::NetRng;
use crate::volume::{shared, Dims, SharedVolume};
use serde::{Deserialize, Serialize};

/// Configuration for a dropout layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropoutConfig {
    /// Probability of dropping each element (default 0.5)
    pub drop_prob: f64,
}

impl Default for DropoutConfig {
    fn default() -> Self {
        Self { drop_prob: 0.5 }
    }
}

impl DropoutConfig {
    pub fn new(drop_prob: f64) -> Self {
        Self { drop_prob }
    }
}

/// Dropout layer for regularization.
///
/// The layer owns a generator forked from the one it was constructed with, so
/// sampling is reproducible from the network seed.
///
/// # Example
///
/// ```ignore
/// use reticulum::layers::{DropoutConfig, DropoutLayer};
/// use reticulum::utils::NetRng;
/// use reticulum::volume::Dims;
///
/// let mut rng = NetRng::new(42);
/// let layer = DropoutLayer::new(Dims::flat(512), &DropoutConfig::new(0.5), &mut rng)?;
/// assert_eq!(layer.drop_prob(), 0.5);
/// ```
pub struct DropoutLayer {
    dims: Dims,
    drop_prob: f64,
    /// `true` at positions zeroed by the last training forward pass.
    dropped: Vec<bool>,
    rng: NetRng,
    in_act: Option<SharedVolume>,
    out_act: Option<SharedVolume>,
}

impl DropoutLayer {
    /// # Errors
    ///
    /// Returns an error if `drop_prob` is outside `[0, 1]`.
    pub fn new(dims: Dims, config: &DropoutConfig, rng: &mut NetRng) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.drop_prob) {
            return Err(Error::definition(format!(
                "dropout drop_prob must be in [0, 1], got {}",
                config.drop_prob
            )));
        }

        Ok(Self {
            dims,
            drop_prob: config.drop_prob,
            dropped: vec![false; dims.size()],
            rng: rng.fork(),
            in_act: None,
            out_act: None,
        })
    }

    pub fn drop_prob(&self) -> f64 {
        self.drop_prob
    }

    /// Mask recorded by the most recent forward pass.
    pub fn dropped(&self) -> &[bool] {
        &self.dropped
    }
}

impl Layer for DropoutLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Dropout
    }

    fn input_dims(&self) -> Dims {
        self.dims
    }

    fn output_dims(&self) -> Dims {
        self.dims
    }

    fn forward(&mut self, input: SharedVolume, is_training: bool) -> SharedVolume {
        let mut out = input.borrow().clone();
        assert_eq!(
            out.len(),
            self.dropped.len(),
            "dropout input len mismatch: expected {}, got {}",
            self.dropped.len(),
            out.len()
        );

        if is_training {
            for (w, dropped) in out.weights_mut().iter_mut().zip(self.dropped.iter_mut()) {
                *dropped = self.rng.next_f64() < self.drop_prob;
                if *dropped {
                    *w = 0.0;
                }
            }
        } else {
            for w in out.weights_mut() {
                *w *= self.drop_prob;
            }
            self.dropped.fill(false);
        }

        let out = shared(out);
        self.in_act = Some(input);
        self.out_act = Some(out.clone());
        out
    }

    fn backward(&mut self) {
        let output = cached(&self.out_act, LayerKind::Dropout).borrow();
        let mut input = cached(&self.in_act, LayerKind::Dropout).borrow_mut();
        input.zero_grad();

        for (i, &dropped) in self.dropped.iter().enumerate() {
            if !dropped {
                input.set_grad_by_index(i, output.get_grad_by_index(i));
            }
        }
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;

    fn layer(size: usize, drop_prob: f64) -> DropoutLayer {
        let mut rng = NetRng::new(42);
        DropoutLayer::new(Dims::flat(size), &DropoutConfig::new(drop_prob), &mut rng).unwrap()
    }

    #[test]
    fn test_dropout_default_prob() {
        assert_eq!(DropoutConfig::default().drop_prob, 0.5);
    }

    #[test]
    fn test_dropout_invalid_prob() {
        let mut rng = NetRng::new(42);
        assert!(DropoutLayer::new(Dims::flat(4), &DropoutConfig::new(1.5), &mut rng).is_err());
        assert!(DropoutLayer::new(Dims::flat(4), &DropoutConfig::new(-0.1), &mut rng).is_err());
    }

    #[test]
    fn test_dropout_inference_scales() {
        let mut layer = layer(3, 0.5);
        let out = layer.forward(shared(Volume::from_vec(vec![2.0, 4.0, -6.0])), false);
        assert_eq!(out.borrow().weights(), &[1.0, 2.0, -3.0]);
        assert!(layer.dropped().iter().all(|&d| !d));
    }

    #[test]
    fn test_dropout_training_mask_matches_output() {
        let mut layer = layer(200, 0.5);
        let out = layer.forward(shared(Volume::filled(1, 1, 200, 1.0)), true);
        let out = out.borrow();

        for (w, &dropped) in out.weights().iter().zip(layer.dropped()) {
            assert_eq!(*w, if dropped { 0.0 } else { 1.0 });
        }
        let count = layer.dropped().iter().filter(|&&d| d).count();
        assert!(count > 50 && count < 150, "dropped {} of 200", count);
    }

    #[test]
    fn test_dropout_same_seed_same_mask() {
        let mut a = layer(64, 0.3);
        let mut b = layer(64, 0.3);
        a.forward(shared(Volume::zeros(1, 1, 64)), true);
        b.forward(shared(Volume::zeros(1, 1, 64)), true);
        assert_eq!(a.dropped(), b.dropped());
    }
}
