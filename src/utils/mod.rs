//! Shared utilities for the network implementation
//!
//! This module provides the seeded random number generator and the scalar
//! activation helpers used by the elementwise layers.

pub mod activations;
pub mod rng;

pub use rng::NetRng;
