//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait and one implementation per layer
//! variant. Every layer consumes and produces [`crate::volume::Volume`]s and
//! caches the pair it last saw so that backward can run without arguments.

mod r#trait;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod input;
pub mod maxout;
pub mod nonlinear;
pub mod pool;
pub mod regression;
pub mod softmax;
pub mod svm;

// Re-export the layer traits for convenience
pub use r#trait::{Layer, LayerKind, LossLayer, ParamGroup, RegressionLossLayer};
pub(crate) use r#trait::cached;

pub use conv2d::{ConvConfig, ConvLayer};
pub use dense::{FullyConnectedConfig, FullyConnectedLayer};
pub use dropout::{DropoutConfig, DropoutLayer};
pub use input::InputLayer;
pub use maxout::{MaxoutConfig, MaxoutLayer};
pub use nonlinear::{ReluLayer, SigmoidLayer, TanhLayer};
pub use pool::{PoolConfig, PoolLayer};
pub use regression::RegressionLayer;
pub use softmax::SoftmaxLayer;
pub use svm::SvmLayer;
