//! Reticulum: volume-based neural networks
//!
//! This library provides a small automatic-differentiation engine for
//! feed-forward networks: a 3-D tensor with a parallel gradient buffer
//! ([`Volume`]), layers with hand-derived backward passes, a [`Network`] that
//! chains them, and a [`Trainer`] that turns accumulated gradients into
//! parameter updates.
//!
//! # Modules
//!
//! - `volume`: Volume tensor and its dimensions
//! - `layers`: Layer traits and implementations (fc, conv, pool, softmax, etc.)
//! - `architecture`: Layer definitions, validation and chain building
//! - `network`: Forward and backward propagation over a layer chain
//! - `optimizers`: Update rules (SGD, Adagrad, Adam, etc.)
//! - `config`: Trainer hyperparameters
//! - `trainer`: Training steps with batching and weight decay
//! - `utils`: Seeded RNG and activation helpers
//! - `error`: Construction and configuration errors

pub mod architecture;
pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod trainer;
pub mod utils;
pub mod volume;

pub use config::TrainerOptions;
pub use error::{Error, Result};
pub use network::Network;
pub use trainer::{Target, Trainer, TrainingResult};
pub use volume::{Dims, Volume};
