//! Layer chain driving forward and backward propagation

use crate::architecture::{build_layers, ArchitectureConfig, LayerDef};
use crate::error::Result;
use crate::layers::{Layer, ParamGroup};
use crate::utils::activations::argmax;
use crate::utils::NetRng;
use crate::volume::{shared, SharedVolume, Volume};
use tracing::debug;

/// An ordered chain of layers ending in a loss layer.
///
/// # Example
///
/// ```
/// use reticulum::architecture::LayerDef;
/// use reticulum::layers::LayerKind;
/// use reticulum::utils::NetRng;
/// use reticulum::volume::Volume;
/// use reticulum::Network;
///
/// let defs = vec![
///     LayerDef::input(1, 1, 2),
///     LayerDef::fc(2),
///     LayerDef::new(LayerKind::SoftMax),
/// ];
/// let mut net = Network::new(&defs, &mut NetRng::new(7)).unwrap();
/// let probs = net.forward(Volume::from_vec(vec![0.5, -0.5]), false);
/// assert!((probs.borrow().weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
/// ```
pub struct Network {
    layers: Vec<Box<dyn Layer>>,
    last_output: Option<SharedVolume>,
}

impl Network {
    /// Validates `defs`, expands activations and builds every layer.
    ///
    /// # Errors
    ///
    /// See [`build_layers`].
    pub fn new(defs: &[LayerDef], rng: &mut NetRng) -> Result<Self> {
        let layers = build_layers(defs, rng)?;
        let net = Self {
            layers,
            last_output: None,
        };
        debug!(
            layers = net.layers.len(),
            parameters = net.parameter_count(),
            input = %net.layers[0].input_dims(),
            output = %net.tail().output_dims(),
            "network assembled"
        );
        Ok(net)
    }

    /// Builds a network from a loaded architecture configuration.
    pub fn from_config(config: &ArchitectureConfig, rng: &mut NetRng) -> Result<Self> {
        Self::new(&config.layers, rng)
    }

    /// Feeds `input` through every layer and returns the tail's output.
    pub fn forward(&mut self, input: Volume, is_training: bool) -> SharedVolume {
        self.forward_shared(shared(input), is_training)
    }

    /// Like [`Network::forward`] for a volume the caller keeps a handle to,
    /// e.g. to read the input gradient after backward.
    pub fn forward_shared(&mut self, input: SharedVolume, is_training: bool) -> SharedVolume {
        let output = self
            .layers
            .iter_mut()
            .fold(input, |act, layer| layer.forward(act, is_training));
        self.last_output = Some(output.clone());
        output
    }

    /// Classification loss against `class_index`, followed by the backward sweep.
    ///
    /// # Panics
    ///
    /// Panics if the tail is not a classification loss layer or the index is
    /// out of range.
    pub fn backward(&mut self, class_index: usize) -> f64 {
        let loss = self
            .tail_mut()
            .as_loss_mut()
            .unwrap_or_else(|| panic!("Unsupported operation: tail layer has no class loss"))
            .loss(class_index);
        self.backward_hidden();
        loss
    }

    /// Regression loss over every output dimension, followed by the backward sweep.
    ///
    /// # Panics
    ///
    /// Panics if the tail is not a regression layer or `targets` has the wrong length.
    pub fn multi_dimensional_loss(&mut self, targets: &[f64]) -> f64 {
        let loss = self
            .tail_mut()
            .as_regression_mut()
            .unwrap_or_else(|| panic!("Unsupported operation: tail layer has no regression loss"))
            .multi_dimensional_loss(targets);
        self.backward_hidden();
        loss
    }

    /// Regression loss on one output dimension, followed by the backward sweep.
    ///
    /// # Panics
    ///
    /// Panics if the tail is not a regression layer or `index` is out of range.
    pub fn dimensional_loss(&mut self, index: usize, value: f64) -> f64 {
        let loss = self
            .tail_mut()
            .as_regression_mut()
            .unwrap_or_else(|| panic!("Unsupported operation: tail layer has no regression loss"))
            .dimensional_loss(index, value);
        self.backward_hidden();
        loss
    }

    /// Loss of `input` against `class_index` in inference mode.
    ///
    /// Only the tail's loss runs; parameter gradients are left untouched.
    ///
    /// # Panics
    ///
    /// Panics if the tail is not a classification loss layer or the index is
    /// out of range.
    pub fn cost_loss(&mut self, input: Volume, class_index: usize) -> f64 {
        self.forward(input, false);
        self.tail_mut()
            .as_loss_mut()
            .unwrap_or_else(|| panic!("Unsupported operation: tail layer has no class loss"))
            .loss(class_index)
    }

    /// Index of the largest value in the tail's last output.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Network::forward`].
    pub fn prediction(&self) -> usize {
        let output = self.output();
        let output = output.borrow();
        argmax(output.weights()).map_or(0, |(i, _)| i)
    }

    /// Trainable parameter groups of every layer, head to tail.
    pub fn response(&mut self) -> Vec<ParamGroup<'_>> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.response())
            .collect()
    }

    /// The tail's last output.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Network::forward`].
    pub fn output(&self) -> SharedVolume {
        self.last_output
            .clone()
            .unwrap_or_else(|| panic!("network output read before forward"))
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    fn tail(&self) -> &dyn Layer {
        self.layers[self.layers.len() - 1].as_ref()
    }

    fn tail_mut(&mut self) -> &mut dyn Layer {
        let last = self.layers.len() - 1;
        self.layers[last].as_mut()
    }

    /// Backward over every layer except the tail, in reverse order.
    fn backward_hidden(&mut self) {
        let hidden = self.layers.len() - 1;
        for layer in self.layers[..hidden].iter_mut().rev() {
            layer.backward();
        }
    }
}
