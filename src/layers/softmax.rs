//! Softmax classifier with cross-entropy loss

use crate::layers::{cached, Layer, LayerKind, LossLayer, ParamGroup};
use crate::volume::{shared, Dims, SharedVolume, Volume};

/// Normalizes the flattened input into class probabilities.
///
/// Backward is a no-op: [`LossLayer::loss`] writes the input gradient
/// directly, and the network never calls `backward` on its tail.
pub struct SoftmaxLayer {
    input: Dims,
    output: Dims,
    /// Probabilities from the last forward pass.
    es: Vec<f64>,
    in_act: Option<SharedVolume>,
    out_act: Option<SharedVolume>,
}

impl SoftmaxLayer {
    pub fn new(input: Dims) -> Self {
        let classes = input.size();
        Self {
            input,
            output: Dims::flat(classes),
            es: vec![0.0; classes],
            in_act: None,
            out_act: None,
        }
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.es
    }
}

impl Layer for SoftmaxLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::SoftMax
    }

    fn input_dims(&self) -> Dims {
        self.input
    }

    fn output_dims(&self) -> Dims {
        self.output
    }

    fn forward(&mut self, input: SharedVolume, _is_training: bool) -> SharedVolume {
        {
            let vol = input.borrow();
            let x = vol.weights();
            assert_eq!(
                x.len(),
                self.es.len(),
                "softmax input len mismatch: expected {}, got {}",
                self.es.len(),
                x.len()
            );

            let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for (e, &v) in self.es.iter_mut().zip(x) {
                *e = (v - max).exp();
                sum += *e;
            }
            for e in &mut self.es {
                *e /= sum;
            }
        }

        let out = shared(Volume::from_vec(self.es.clone()));
        self.in_act = Some(input);
        self.out_act = Some(out.clone());
        out
    }

    fn backward(&mut self) {}

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }

    fn as_loss_mut(&mut self) -> Option<&mut dyn LossLayer> {
        Some(self)
    }
}

impl LossLayer for SoftmaxLayer {
    fn loss(&mut self, class_index: usize) -> f64 {
        assert!(
            class_index < self.es.len(),
            "class index {} out of range for {} classes",
            class_index,
            self.es.len()
        );

        let mut input = cached(&self.in_act, LayerKind::SoftMax).borrow_mut();
        input.zero_grad();
        for (i, (g, &p)) in input.gradients_mut().iter_mut().zip(&self.es).enumerate() {
            let indicator = if i == class_index { 1.0 } else { 0.0 };
            *g = p - indicator;
        }

        -self.es[class_index].ln()
    }
}
