//! Fully connected layer implementation
//!
//! Every output neuron sees the whole input volume flattened into a vector and
//! computes `dot(weights_n, input) + bias_n`.

use crate::error::{Error, Result};
use crate::layers::{cached, Layer, LayerKind, ParamGroup};
use crate::utils::NetRng;
use crate::volume::{shared, Dims, SharedVolume, Volume};
use serde::{Deserialize, Serialize};

/// Configuration for a fully connected layer.
///
/// # Example
///
/// ```json
/// { "type": "fc", "num_neurons": 10, "l2_decay_mul": 1.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullyConnectedConfig {
    /// Number of output neurons
    pub num_neurons: usize,
    /// Multiplier applied to the trainer's L1 decay for the weights (default 0.0)
    pub l1_decay_mul: f64,
    /// Multiplier applied to the trainer's L2 decay for the weights (default 1.0)
    pub l2_decay_mul: f64,
    /// Initial value of every bias (default 0.0)
    pub bias_pref: f64,
}

impl Default for FullyConnectedConfig {
    fn default() -> Self {
        Self {
            num_neurons: 0,
            l1_decay_mul: 0.0,
            l2_decay_mul: 1.0,
            bias_pref: 0.0,
        }
    }
}

impl FullyConnectedConfig {
    pub fn new(num_neurons: usize) -> Self {
        Self {
            num_neurons,
            ..Self::default()
        }
    }
}

/// Fully connected layer with one weight volume per neuron and a shared bias volume.
///
/// # Example
///
/// ```ignore
/// use reticulum::layers::{FullyConnectedConfig, FullyConnectedLayer};
/// use reticulum::utils::NetRng;
/// use reticulum::volume::Dims;
///
/// let mut rng = NetRng::new(42);
/// let layer = FullyConnectedLayer::new(Dims::new(4, 4, 3), &FullyConnectedConfig::new(10), &mut rng)?;
/// assert_eq!(layer.output_dims(), Dims::flat(10));
/// ```
pub struct FullyConnectedLayer {
    input: Dims,
    output: Dims,
    l1_decay_mul: f64,
    l2_decay_mul: f64,
    filters: Vec<Volume>,
    biases: Volume,
    in_act: Option<SharedVolume>,
    out_act: Option<SharedVolume>,
}

impl FullyConnectedLayer {
    /// Create a new layer with Gaussian-initialized weights.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_neurons` is zero or the input is empty.
    pub fn new(input: Dims, config: &FullyConnectedConfig, rng: &mut NetRng) -> Result<Self> {
        if config.num_neurons == 0 {
            return Err(Error::definition("fc layer requires num_neurons > 0"));
        }
        let num_inputs = input.size();
        if num_inputs == 0 {
            return Err(Error::definition("fc layer input must not be empty"));
        }

        let filters = (0..config.num_neurons)
            .map(|_| Volume::random(1, 1, num_inputs, rng))
            .collect();

        Ok(Self {
            input,
            output: Dims::flat(config.num_neurons),
            l1_decay_mul: config.l1_decay_mul,
            l2_decay_mul: config.l2_decay_mul,
            filters,
            biases: Volume::filled(1, 1, config.num_neurons, config.bias_pref),
            in_act: None,
            out_act: None,
        })
    }

    pub fn filters(&self) -> &[Volume] {
        &self.filters
    }

    pub fn biases(&self) -> &Volume {
        &self.biases
    }
}

impl Layer for FullyConnectedLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::FullyConnected
    }

    fn input_dims(&self) -> Dims {
        self.input
    }

    fn output_dims(&self) -> Dims {
        self.output
    }

    fn forward(&mut self, input: SharedVolume, _is_training: bool) -> SharedVolume {
        let mut out = Volume::zeros_like(self.output);
        {
            let vol = input.borrow();
            let x = vol.weights();
            assert_eq!(
                x.len(),
                self.input.size(),
                "fc input len mismatch: expected {}, got {}",
                self.input.size(),
                x.len()
            );
            for (i, filter) in self.filters.iter().enumerate() {
                let dot: f64 = filter.weights().iter().zip(x).map(|(w, v)| w * v).sum();
                out.set_by_index(i, dot + self.biases.get_by_index(i));
            }
        }

        let out = shared(out);
        self.in_act = Some(input);
        self.out_act = Some(out.clone());
        out
    }

    fn backward(&mut self) {
        let output = cached(&self.out_act, LayerKind::FullyConnected).borrow();
        let mut input = cached(&self.in_act, LayerKind::FullyConnected).borrow_mut();
        input.zero_grad();

        for (i, filter) in self.filters.iter_mut().enumerate() {
            let chain_grad = output.get_grad_by_index(i);
            for d in 0..input.len() {
                input.add_grad_by_index(d, filter.get_by_index(d) * chain_grad);
                filter.add_grad_by_index(d, input.get_by_index(d) * chain_grad);
            }
            self.biases.add_grad_by_index(i, chain_grad);
        }
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        let (l1_decay_mul, l2_decay_mul) = (self.l1_decay_mul, self.l2_decay_mul);
        let mut groups: Vec<ParamGroup<'_>> = self
            .filters
            .iter_mut()
            .map(|filter| {
                let (weights, gradients) = filter.planes_mut();
                ParamGroup {
                    weights,
                    gradients,
                    l1_decay_mul,
                    l2_decay_mul,
                }
            })
            .collect();

        let (weights, gradients) = self.biases.planes_mut();
        groups.push(ParamGroup {
            weights,
            gradients,
            l1_decay_mul: 0.0,
            l2_decay_mul: 0.0,
        });
        groups
    }

    fn parameter_count(&self) -> usize {
        self.filters.iter().map(Volume::len).sum::<usize>() + self.biases.len()
    }
}
