//! Layer trait definitions
//!
//! This module defines the contract every layer variant implements, plus the
//! two optional capabilities a network tail can provide: classification loss
//! ([`LossLayer`]) and regression loss ([`RegressionLossLayer`]).

use crate::volume::{Dims, SharedVolume};
use serde::{Deserialize, Serialize};

/// Tag identifying a layer variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "fc")]
    FullyConnected,
    #[serde(rename = "conv")]
    Conv,
    #[serde(rename = "pool")]
    Pool,
    #[serde(rename = "relu")]
    Relu,
    #[serde(rename = "sigmoid")]
    Sigmoid,
    #[serde(rename = "tanh")]
    Tanh,
    #[serde(rename = "maxout")]
    Maxout,
    #[serde(rename = "dropout")]
    Dropout,
    #[serde(rename = "softmax")]
    SoftMax,
    #[serde(rename = "svm")]
    Svm,
    #[serde(rename = "regression")]
    Regression,
}

impl LayerKind {
    /// Whether a layer of this kind can terminate a network.
    pub fn is_loss(self) -> bool {
        matches!(self, LayerKind::SoftMax | LayerKind::Svm | LayerKind::Regression)
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::FullyConnected => "fc",
            LayerKind::Conv => "conv",
            LayerKind::Pool => "pool",
            LayerKind::Relu => "relu",
            LayerKind::Sigmoid => "sigmoid",
            LayerKind::Tanh => "tanh",
            LayerKind::Maxout => "maxout",
            LayerKind::Dropout => "dropout",
            LayerKind::SoftMax => "softmax",
            LayerKind::Svm => "svm",
            LayerKind::Regression => "regression",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One independently updatable set of trainable weights.
///
/// The slices alias the owning layer's parameter volumes, so an optimizer
/// writing into `weights` updates the layer in place.
#[derive(Debug)]
pub struct ParamGroup<'a> {
    pub weights: &'a mut [f64],
    pub gradients: &'a mut [f64],
    pub l1_decay_mul: f64,
    pub l2_decay_mul: f64,
}

/// Core trait for network layers.
///
/// A layer caches the input it was last given and the output it produced.
/// [`Layer::backward`] reads the gradient that the next layer wrote into that
/// cached output and writes the gradient w.r.t. the cached input. Parameter
/// gradients accumulate across calls until the trainer consumes them.
pub trait Layer {
    /// The variant tag of this layer.
    fn kind(&self) -> LayerKind;

    /// Dimensions of the volume this layer expects.
    fn input_dims(&self) -> Dims;

    /// Dimensions of the volume this layer produces.
    fn output_dims(&self) -> Dims;

    /// Forward propagation.
    ///
    /// Caches `input`, produces and caches a new output volume, and returns it.
    /// Only dropout reads `is_training`.
    fn forward(&mut self, input: SharedVolume, is_training: bool) -> SharedVolume;

    /// Backward propagation.
    ///
    /// Zeroes the cached input's gradient plane, then fills it from the cached
    /// output's gradient plane and the forward-time intermediates.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Layer::forward`], or on a loss-only layer.
    fn backward(&mut self);

    /// Trainable parameter groups, empty for parameterless layers.
    fn response(&mut self) -> Vec<ParamGroup<'_>>;

    /// Number of trainable scalars.
    fn parameter_count(&self) -> usize {
        0
    }

    /// Classification-loss capability.
    fn as_loss_mut(&mut self) -> Option<&mut dyn LossLayer> {
        None
    }

    /// Regression-loss capability.
    fn as_regression_mut(&mut self) -> Option<&mut dyn RegressionLossLayer> {
        None
    }
}

/// A tail layer turning the output into a scalar loss against a class index.
pub trait LossLayer: Layer {
    /// Loss for the most recent forward pass.
    ///
    /// Also seeds the gradient of the cached input; there is no separate
    /// backward call for the tail.
    ///
    /// # Panics
    ///
    /// Panics if `class_index` is outside the output range.
    fn loss(&mut self, class_index: usize) -> f64;
}

/// A tail layer supervising real-valued outputs.
pub trait RegressionLossLayer: Layer {
    /// Squared loss `Σ 0.5 (prediction - target)²` over every output dimension.
    ///
    /// # Panics
    ///
    /// Panics if `targets.len()` differs from the output size.
    fn multi_dimensional_loss(&mut self, targets: &[f64]) -> f64;

    /// Squared loss on a single dimension; other input gradients stay zero.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the output range.
    fn dimensional_loss(&mut self, index: usize, value: f64) -> f64;
}

/// The volume cached in `slot`, or a panic naming the layer kind.
pub(crate) fn cached(slot: &Option<SharedVolume>, kind: LayerKind) -> &SharedVolume {
    slot.as_ref()
        .unwrap_or_else(|| panic!("{} layer used before forward", kind))
}
