//! Multiclass SVM (hinge loss) tail layer

use crate::layers::{cached, Layer, LayerKind, LossLayer, ParamGroup};
use crate::volume::{Dims, SharedVolume};

const MARGIN: f64 = 1.0;

/// Identity forward with a one-vs-all hinge loss.
pub struct SvmLayer {
    input: Dims,
    output: Dims,
    in_act: Option<SharedVolume>,
}

impl SvmLayer {
    pub fn new(input: Dims) -> Self {
        Self {
            input,
            output: Dims::flat(input.size()),
            in_act: None,
        }
    }
}

impl Layer for SvmLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Svm
    }

    fn input_dims(&self) -> Dims {
        self.input
    }

    fn output_dims(&self) -> Dims {
        self.output
    }

    fn forward(&mut self, input: SharedVolume, _is_training: bool) -> SharedVolume {
        self.in_act = Some(input.clone());
        input
    }

    fn backward(&mut self) {
        panic!("Unsupported operation: backward on svm layer");
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }

    fn as_loss_mut(&mut self) -> Option<&mut dyn LossLayer> {
        Some(self)
    }
}

impl LossLayer for SvmLayer {
    fn loss(&mut self, class_index: usize) -> f64 {
        let mut input = cached(&self.in_act, LayerKind::Svm).borrow_mut();
        assert!(
            class_index < input.len(),
            "class index {} out of range for {} classes",
            class_index,
            input.len()
        );
        input.zero_grad();

        let target_score = input.get_by_index(class_index);
        let mut loss = 0.0;
        for j in 0..input.len() {
            if j == class_index {
                continue;
            }
            let violation = input.get_by_index(j) - target_score + MARGIN;
            if violation > 0.0 {
                input.add_grad_by_index(j, 1.0);
                input.add_grad_by_index(class_index, -1.0);
                loss += violation;
            }
        }
        loss
    }
}
