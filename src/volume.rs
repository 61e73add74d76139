//! Three-dimensional tensors carrying values and gradients
//!
//! A [`Volume`] is a block of numbers with a width (`sx`), a height (`sy`) and a
//! depth. It holds everything that flows through a network: activations,
//! filters, biases, and the gradients with respect to each of them. Values and
//! gradients are stored in two parallel flat buffers, depth innermost:
//!
//! ```text
//! index(x, y, d) = (sx * y + x) * depth + d
//! ```

use crate::utils::NetRng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// A volume shared between two adjacent layers.
///
/// Layer `i` produces it as output and layer `i + 1` caches it as input; the
/// later layer writes the input gradients that the earlier one reads back.
pub type SharedVolume = Rc<RefCell<Volume>>;

/// Wrap a volume so it can be handed through a network.
pub fn shared(volume: Volume) -> SharedVolume {
    Rc::new(RefCell::new(volume))
}

/// Width, height and depth of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dims {
    pub sx: usize,
    pub sy: usize,
    pub depth: usize,
}

impl Dims {
    pub fn new(sx: usize, sy: usize, depth: usize) -> Self {
        Self { sx, sy, depth }
    }

    /// A 1×1×depth channel vector.
    pub fn flat(depth: usize) -> Self {
        Self::new(1, 1, depth)
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.sx * self.sy * self.depth
    }
}

impl std::fmt::Display for Dims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.sx, self.sy, self.depth)
    }
}

/// 3-D tensor with a weight plane and a gradient plane of equal length.
#[derive(Debug, PartialEq)]
pub struct Volume {
    dims: Dims,
    weights: Vec<f64>,
    gradients: Vec<f64>,
}

impl Volume {
    /// Zero-filled volume.
    pub fn zeros(sx: usize, sy: usize, depth: usize) -> Self {
        Self::filled(sx, sy, depth, 0.0)
    }

    /// Volume with every weight set to `value` and zero gradients.
    pub fn filled(sx: usize, sy: usize, depth: usize, value: f64) -> Self {
        let n = sx * sy * depth;
        Self {
            dims: Dims::new(sx, sy, depth),
            weights: vec![value; n],
            gradients: vec![0.0; n],
        }
    }

    /// Gaussian-initialized volume with standard deviation `sqrt(1 / n)`.
    ///
    /// Scaling by the element count keeps the output variance of a neuron
    /// independent of its number of incoming connections.
    pub fn random(sx: usize, sy: usize, depth: usize, rng: &mut NetRng) -> Self {
        let n = sx * sy * depth;
        let std_dev = (1.0 / n as f64).sqrt();
        let weights = (0..n).map(|_| rng.gaussian(0.0, std_dev)).collect();
        Self {
            dims: Dims::new(sx, sy, depth),
            weights,
            gradients: vec![0.0; n],
        }
    }

    /// Volume with explicit weights.
    ///
    /// Only 1×1×depth channel vectors can be built this way.
    ///
    /// # Panics
    ///
    /// Panics if `sx != 1`, `sy != 1` or `weights.len() != depth`.
    pub fn with_weights(sx: usize, sy: usize, depth: usize, weights: Vec<f64>) -> Self {
        assert_eq!(
            weights.len(),
            depth,
            "Invalid input weights: expected {} values for depth, got {}",
            depth,
            weights.len()
        );
        assert_eq!(sx, 1, "Invalid volume dimensions: sx must equal 1 when weights are given");
        assert_eq!(sy, 1, "Invalid volume dimensions: sy must equal 1 when weights are given");

        let n = weights.len();
        Self {
            dims: Dims::new(1, 1, depth),
            weights,
            gradients: vec![0.0; n],
        }
    }

    /// 1×1×len channel vector holding `weights`.
    pub fn from_vec(weights: Vec<f64>) -> Self {
        let depth = weights.len();
        Self::with_weights(1, 1, depth, weights)
    }

    /// Zero-filled volume of the given dimensions.
    pub fn zeros_like(dims: Dims) -> Self {
        Self::zeros(dims.sx, dims.sy, dims.depth)
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn sx(&self) -> usize {
        self.dims.sx
    }

    pub fn sy(&self) -> usize {
        self.dims.sy
    }

    pub fn depth(&self) -> usize {
        self.dims.depth
    }

    /// Number of elements in each plane.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Flat index of position (x, y, d).
    #[inline]
    pub fn index(&self, x: usize, y: usize, d: usize) -> usize {
        (self.dims.sx * y + x) * self.dims.depth + d
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, d: usize) -> f64 {
        self.weights[self.index(x, y, d)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, d: usize, value: f64) {
        let ix = self.index(x, y, d);
        self.weights[ix] = value;
    }

    #[inline]
    pub fn add(&mut self, x: usize, y: usize, d: usize, value: f64) {
        let ix = self.index(x, y, d);
        self.weights[ix] += value;
    }

    #[inline]
    pub fn mult(&mut self, x: usize, y: usize, d: usize, value: f64) {
        let ix = self.index(x, y, d);
        self.weights[ix] *= value;
    }

    #[inline]
    pub fn get_grad(&self, x: usize, y: usize, d: usize) -> f64 {
        self.gradients[self.index(x, y, d)]
    }

    #[inline]
    pub fn set_grad(&mut self, x: usize, y: usize, d: usize, value: f64) {
        let ix = self.index(x, y, d);
        self.gradients[ix] = value;
    }

    #[inline]
    pub fn add_grad(&mut self, x: usize, y: usize, d: usize, value: f64) {
        let ix = self.index(x, y, d);
        self.gradients[ix] += value;
    }

    #[inline]
    pub fn mult_grad(&mut self, x: usize, y: usize, d: usize, value: f64) {
        let ix = self.index(x, y, d);
        self.gradients[ix] *= value;
    }

    #[inline]
    pub fn get_by_index(&self, index: usize) -> f64 {
        self.weights[index]
    }

    #[inline]
    pub fn set_by_index(&mut self, index: usize, value: f64) {
        self.weights[index] = value;
    }

    #[inline]
    pub fn add_by_index(&mut self, index: usize, value: f64) {
        self.weights[index] += value;
    }

    #[inline]
    pub fn mult_by_index(&mut self, index: usize, value: f64) {
        self.weights[index] *= value;
    }

    #[inline]
    pub fn get_grad_by_index(&self, index: usize) -> f64 {
        self.gradients[index]
    }

    #[inline]
    pub fn set_grad_by_index(&mut self, index: usize, value: f64) {
        self.gradients[index] = value;
    }

    #[inline]
    pub fn add_grad_by_index(&mut self, index: usize, value: f64) {
        self.gradients[index] += value;
    }

    #[inline]
    pub fn mult_grad_by_index(&mut self, index: usize, value: f64) {
        self.gradients[index] *= value;
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn gradients(&self) -> &[f64] {
        &self.gradients
    }

    pub fn gradients_mut(&mut self) -> &mut [f64] {
        &mut self.gradients
    }

    /// Mutable access to both planes at once.
    pub fn planes_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.weights, &mut self.gradients)
    }

    /// Clear the gradient plane, leaving weights untouched.
    pub fn zero_grad(&mut self) {
        self.gradients.fill(0.0);
    }

    /// Overwrite every weight with `value`.
    pub fn set_const(&mut self, value: f64) {
        self.weights.fill(value);
    }

    /// Add another volume's weights elementwise. Gradients are not affected.
    ///
    /// # Panics
    ///
    /// Panics if the volumes differ in size.
    pub fn add_from(&mut self, other: &Volume) {
        self.add_from_scaled(other, 1.0);
    }

    /// Add another volume's weights scaled by `scale`. Gradients are not affected.
    ///
    /// # Panics
    ///
    /// Panics if the volumes differ in size.
    pub fn add_from_scaled(&mut self, other: &Volume, scale: f64) {
        assert_eq!(
            self.len(),
            other.len(),
            "volume size mismatch: {} vs {}",
            self.len(),
            other.len()
        );
        for (w, o) in self.weights.iter_mut().zip(other.weights.iter()) {
            *w += o * scale;
        }
    }

    /// Same dimensions, zero weights and zero gradients.
    pub fn clone_and_zero(&self) -> Volume {
        Self::zeros_like(self.dims)
    }
}

/// Cloning copies the weight plane and starts a fresh, all-zero gradient plane,
/// which is what a layer wants when deriving its output from its input.
impl Clone for Volume {
    fn clone(&self) -> Self {
        Self {
            dims: self.dims,
            weights: self.weights.clone(),
            gradients: vec![0.0; self.gradients.len()],
        }
    }
}
