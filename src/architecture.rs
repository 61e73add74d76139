//! Architecture definition structures
//!
//! A network is described by an ordered list of [`LayerDef`]s, either built in
//! code or loaded from JSON. This module validates such a list, expands
//! implied activations into their own layers and instantiates the chain.

use crate::error::{Error, Result};
use crate::layers::{
    ConvConfig, ConvLayer, DropoutConfig, DropoutLayer, FullyConnectedConfig,
    FullyConnectedLayer, InputLayer, Layer, LayerKind, MaxoutConfig, MaxoutLayer, PoolConfig,
    PoolLayer, RegressionLayer, ReluLayer, SigmoidLayer, SoftmaxLayer, SvmLayer, TanhLayer,
};
use crate::utils::NetRng;
use crate::volume::Dims;
use serde::{Deserialize, Serialize};
use std::fs;

/// Kind-specific configuration of a layer definition.
///
/// The `type` field must match the definition's `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerConfig {
    #[serde(rename = "fc")]
    FullyConnected(FullyConnectedConfig),
    #[serde(rename = "conv")]
    Conv(ConvConfig),
    #[serde(rename = "pool")]
    Pool(PoolConfig),
    #[serde(rename = "dropout")]
    Dropout(DropoutConfig),
    #[serde(rename = "maxout")]
    Maxout(MaxoutConfig),
}

impl LayerConfig {
    /// The layer kind this configuration belongs to.
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerConfig::FullyConnected(_) => LayerKind::FullyConnected,
            LayerConfig::Conv(_) => LayerKind::Conv,
            LayerConfig::Pool(_) => LayerKind::Pool,
            LayerConfig::Dropout(_) => LayerKind::Dropout,
            LayerConfig::Maxout(_) => LayerKind::Maxout,
        }
    }
}

/// Activation implied by a `fc`, `conv` or `pool` definition.
///
/// ```json
/// "activation": "relu"
/// "activation": { "maxout": { "group_size": 3 } }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Maxout {
        #[serde(default = "default_group_size")]
        group_size: usize,
    },
}

fn default_group_size() -> usize {
    MaxoutConfig::default().group_size
}

impl Activation {
    fn to_def(self) -> LayerDef {
        match self {
            Activation::Relu => LayerDef::new(LayerKind::Relu),
            Activation::Sigmoid => LayerDef::new(LayerKind::Sigmoid),
            Activation::Tanh => LayerDef::new(LayerKind::Tanh),
            Activation::Maxout { group_size } => {
                LayerDef::with_config(LayerConfig::Maxout(MaxoutConfig::new(group_size)))
            }
        }
    }
}

/// Definition of a single layer.
///
/// Only the input layer must declare dimensions; every other layer derives its
/// input from the previous layer's output. Dims declared anyway are checked
/// against the derived ones.
///
/// # Example
///
/// ```json
/// { "kind": "conv", "config": { "type": "conv", "filters": 8, "sx": 3, "pad": 1 }, "activation": "relu" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Dims>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Dims>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<LayerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
}

impl LayerDef {
    /// A definition with nothing but its kind.
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            input: None,
            output: None,
            config: None,
            activation: None,
        }
    }

    /// Head of every network.
    pub fn input(sx: usize, sy: usize, depth: usize) -> Self {
        Self {
            output: Some(Dims::new(sx, sy, depth)),
            ..Self::new(LayerKind::Input)
        }
    }

    /// A definition whose kind follows from its configuration.
    pub fn with_config(config: LayerConfig) -> Self {
        Self {
            config: Some(config.clone()),
            ..Self::new(config.kind())
        }
    }

    pub fn fc(num_neurons: usize) -> Self {
        Self::with_config(LayerConfig::FullyConnected(FullyConnectedConfig::new(num_neurons)))
    }

    pub fn conv(config: ConvConfig) -> Self {
        Self::with_config(LayerConfig::Conv(config))
    }

    pub fn pool(config: PoolConfig) -> Self {
        Self::with_config(LayerConfig::Pool(config))
    }

    pub fn activated(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }
}

/// Configuration for the entire neural network architecture.
///
/// # Example
///
/// ```json
/// {
///   "layers": [
///     { "kind": "input", "output": { "sx": 1, "sy": 1, "depth": 2 } },
///     { "kind": "fc", "config": { "type": "fc", "num_neurons": 4 }, "activation": "tanh" },
///     { "kind": "fc", "config": { "type": "fc", "num_neurons": 2 } },
///     { "kind": "softmax" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerDef>,
}

/// Loads an architecture configuration from a JSON file.
///
/// The definition list is validated before returning, so a loaded
/// configuration only fails to build on dimension problems.
///
/// # Examples
///
/// ```no_run
/// use reticulum::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/mlp_classifier.json").unwrap();
/// assert!(arch.layers.len() >= 3);
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_definitions(&config.layers)?;
    Ok(config)
}

/// Structural checks on a definition list.
///
/// # Errors
///
/// - fewer than 3 definitions, a head that is not `input`, or a tail that
///   cannot compute a loss ([`Error::Definition`])
/// - a misplaced input, an input without dims, a missing or mistyped config,
///   or an activation on a kind that cannot carry one ([`Error::Layer`])
pub fn validate_definitions(defs: &[LayerDef]) -> Result<()> {
    if defs.len() < 3 {
        return Err(Error::definition(format!(
            "a network needs at least 3 layers, got {}",
            defs.len()
        )));
    }
    if defs[0].kind != LayerKind::Input {
        return Err(Error::definition(format!(
            "first layer must be input, got {}",
            defs[0].kind
        )));
    }
    let tail = defs[defs.len() - 1].kind;
    if !tail.is_loss() {
        return Err(Error::definition(format!(
            "last layer must be softmax, svm or regression, got {}",
            tail
        )));
    }

    for (index, def) in defs.iter().enumerate() {
        validate_definition(def, index)?;
    }
    Ok(())
}

fn validate_definition(def: &LayerDef, index: usize) -> Result<()> {
    match def.kind {
        LayerKind::Input if index != 0 => {
            return Err(Error::layer(index, "input is only allowed as the first layer"));
        }
        LayerKind::Input if def.output.or(def.input).is_none() => {
            return Err(Error::layer(index, "input layer must declare its dims"));
        }
        _ => {}
    }

    if let (Some(input), Some(output)) = (def.input, def.output) {
        if def.kind == LayerKind::Input && input != output {
            return Err(Error::layer(
                index,
                format!("input layer declares input {} but output {}", input, output),
            ));
        }
    }

    match (&def.config, def.kind) {
        (Some(config), kind) if config.kind() != kind => {
            return Err(Error::layer(
                index,
                format!("{} layer given a {} config", kind, config.kind()),
            ));
        }
        (None, LayerKind::FullyConnected | LayerKind::Conv | LayerKind::Pool) => {
            return Err(Error::layer(
                index,
                format!("{} layer requires a config", def.kind),
            ));
        }
        _ => {}
    }

    if def.activation.is_some()
        && !matches!(
            def.kind,
            LayerKind::FullyConnected | LayerKind::Conv | LayerKind::Pool
        )
    {
        return Err(Error::layer(
            index,
            format!("{} layer cannot carry an activation", def.kind),
        ));
    }

    Ok(())
}

/// Rewrites every definition that carries an activation into the base
/// definition followed by a definition of the activation layer.
pub fn expand_activations(defs: &[LayerDef]) -> Vec<LayerDef> {
    expand_with_origin(defs)
        .into_iter()
        .map(|(_, def)| def)
        .collect()
}

/// Expanded list, each entry paired with the index of the definition it came from.
fn expand_with_origin(defs: &[LayerDef]) -> Vec<(usize, LayerDef)> {
    let mut expanded = Vec::with_capacity(defs.len());
    for (index, def) in defs.iter().enumerate() {
        let mut base = def.clone();
        let activation = base.activation.take();
        expanded.push((index, base));
        if let Some(activation) = activation {
            expanded.push((index, activation.to_def()));
        }
    }
    expanded
}

/// Builds the layer chain described by `defs`.
///
/// Runs [`validate_definitions`], expands activations, then instantiates each
/// layer with the previous layer's output dims as its input. Weight
/// initialization and dropout generators draw from `rng`.
///
/// # Errors
///
/// Any validation error, or an [`Error::Layer`] naming the definition whose
/// config does not fit its input or whose declared dims disagree with the chain.
///
/// # Examples
///
/// ```
/// use reticulum::architecture::{build_layers, LayerDef, Activation};
/// use reticulum::layers::LayerKind;
/// use reticulum::utils::NetRng;
///
/// let defs = vec![
///     LayerDef::input(1, 1, 2),
///     LayerDef::fc(4).activated(Activation::Relu),
///     LayerDef::fc(2),
///     LayerDef::new(LayerKind::SoftMax),
/// ];
/// let mut rng = NetRng::new(42);
/// let layers = build_layers(&defs, &mut rng).unwrap();
/// assert_eq!(layers.len(), 5);
/// ```
pub fn build_layers(defs: &[LayerDef], rng: &mut NetRng) -> Result<Vec<Box<dyn Layer>>> {
    validate_definitions(defs)?;

    let mut layers: Vec<Box<dyn Layer>> = Vec::new();
    let mut previous: Option<Dims> = None;

    for (index, def) in expand_with_origin(defs) {
        let layer = build_layer(&def, previous, rng).map_err(|err| match err {
            Error::Definition(message) => Error::layer(index, message),
            other => other,
        })?;

        if let Some(declared) = def.input {
            if declared != layer.input_dims() {
                return Err(Error::layer(
                    index,
                    format!(
                        "declared input {} does not match {}",
                        declared,
                        layer.input_dims()
                    ),
                ));
            }
        }
        if let Some(declared) = def.output {
            if declared != layer.output_dims() {
                return Err(Error::layer(
                    index,
                    format!(
                        "declared output {} does not match {}",
                        declared,
                        layer.output_dims()
                    ),
                ));
            }
        }

        previous = Some(layer.output_dims());
        layers.push(layer);
    }

    Ok(layers)
}

fn build_layer(def: &LayerDef, previous: Option<Dims>, rng: &mut NetRng) -> Result<Box<dyn Layer>> {
    let input = match (def.kind, previous) {
        (LayerKind::Input, _) => {
            let dims = def
                .output
                .or(def.input)
                .ok_or_else(|| Error::definition("input layer must declare its dims"))?;
            return Ok(Box::new(InputLayer::new(dims)));
        }
        (_, Some(dims)) => dims,
        (kind, None) => {
            return Err(Error::definition(format!("{} layer has no input", kind)));
        }
    };

    let layer: Box<dyn Layer> = match (def.kind, &def.config) {
        (LayerKind::FullyConnected, Some(LayerConfig::FullyConnected(config))) => {
            Box::new(FullyConnectedLayer::new(input, config, rng)?)
        }
        (LayerKind::Conv, Some(LayerConfig::Conv(config))) => {
            Box::new(ConvLayer::new(input, config, rng)?)
        }
        (LayerKind::Pool, Some(LayerConfig::Pool(config))) => {
            Box::new(PoolLayer::new(input, config)?)
        }
        (LayerKind::Dropout, Some(LayerConfig::Dropout(config))) => {
            Box::new(DropoutLayer::new(input, config, rng)?)
        }
        (LayerKind::Dropout, None) => {
            Box::new(DropoutLayer::new(input, &DropoutConfig::default(), rng)?)
        }
        (LayerKind::Maxout, Some(LayerConfig::Maxout(config))) => {
            Box::new(MaxoutLayer::new(input, config)?)
        }
        (LayerKind::Maxout, None) => Box::new(MaxoutLayer::new(input, &MaxoutConfig::default())?),
        (LayerKind::Relu, _) => Box::new(ReluLayer::new(input)),
        (LayerKind::Sigmoid, _) => Box::new(SigmoidLayer::new(input)),
        (LayerKind::Tanh, _) => Box::new(TanhLayer::new(input)),
        (LayerKind::SoftMax, _) => Box::new(SoftmaxLayer::new(input)),
        (LayerKind::Svm, _) => Box::new(SvmLayer::new(input)),
        (LayerKind::Regression, _) => Box::new(RegressionLayer::new(input)),
        (kind, _) => {
            return Err(Error::definition(format!(
                "{} layer has a missing or mistyped config",
                kind
            )));
        }
    };

    Ok(layer)
}
