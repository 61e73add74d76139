//! Elementwise nonlinearities: ReLU, sigmoid and tanh
//!
//! All three map each input element to one output element and have no
//! parameters. Their derivatives are computed from the cached output.

use crate::layers::{cached, Layer, LayerKind, ParamGroup};
use crate::utils::activations::{relu, sigmoid, sigmoid_derivative, tanh_derivative};
use crate::volume::{shared, Dims, SharedVolume};

/// Shared plumbing for the elementwise layers.
struct Elementwise {
    kind: LayerKind,
    dims: Dims,
    in_act: Option<SharedVolume>,
    out_act: Option<SharedVolume>,
}

impl Elementwise {
    fn new(kind: LayerKind, dims: Dims) -> Self {
        Self {
            kind,
            dims,
            in_act: None,
            out_act: None,
        }
    }

    fn forward(&mut self, input: SharedVolume, f: impl Fn(f64) -> f64) -> SharedVolume {
        let mut out = input.borrow().clone();
        for w in out.weights_mut() {
            *w = f(*w);
        }
        let out = shared(out);
        self.in_act = Some(input);
        self.out_act = Some(out.clone());
        out
    }

    /// `input.grad[i] = df(output[i], upstream[i])`
    fn backward(&mut self, df: impl Fn(f64, f64) -> f64) {
        let output = cached(&self.out_act, self.kind).borrow();
        let mut input = cached(&self.in_act, self.kind).borrow_mut();
        input.zero_grad();
        let grads = input.gradients_mut();
        for (i, g) in grads.iter_mut().enumerate() {
            *g = df(output.get_by_index(i), output.get_grad_by_index(i));
        }
    }
}

/// Rectified linear unit: `max(0, x)`.
pub struct ReluLayer(Elementwise);

impl ReluLayer {
    pub fn new(dims: Dims) -> Self {
        Self(Elementwise::new(LayerKind::Relu, dims))
    }
}

impl Layer for ReluLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Relu
    }

    fn input_dims(&self) -> Dims {
        self.0.dims
    }

    fn output_dims(&self) -> Dims {
        self.0.dims
    }

    fn forward(&mut self, input: SharedVolume, _is_training: bool) -> SharedVolume {
        self.0.forward(input, relu)
    }

    fn backward(&mut self) {
        // threshold on the output
        self.0
            .backward(|y, upstream| if y <= 0.0 { 0.0 } else { upstream });
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}

/// Logistic sigmoid: `1 / (1 + e^-x)`.
pub struct SigmoidLayer(Elementwise);

impl SigmoidLayer {
    pub fn new(dims: Dims) -> Self {
        Self(Elementwise::new(LayerKind::Sigmoid, dims))
    }
}

impl Layer for SigmoidLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Sigmoid
    }

    fn input_dims(&self) -> Dims {
        self.0.dims
    }

    fn output_dims(&self) -> Dims {
        self.0.dims
    }

    fn forward(&mut self, input: SharedVolume, _is_training: bool) -> SharedVolume {
        self.0.forward(input, sigmoid)
    }

    fn backward(&mut self) {
        self.0
            .backward(|y, upstream| upstream * sigmoid_derivative(y));
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}

/// Hyperbolic tangent.
pub struct TanhLayer(Elementwise);

impl TanhLayer {
    pub fn new(dims: Dims) -> Self {
        Self(Elementwise::new(LayerKind::Tanh, dims))
    }
}

impl Layer for TanhLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Tanh
    }

    fn input_dims(&self) -> Dims {
        self.0.dims
    }

    fn output_dims(&self) -> Dims {
        self.0.dims
    }

    fn forward(&mut self, input: SharedVolume, _is_training: bool) -> SharedVolume {
        self.0.forward(input, f64::tanh)
    }

    fn backward(&mut self) {
        self.0.backward(|y, upstream| upstream * tanh_derivative(y));
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}
