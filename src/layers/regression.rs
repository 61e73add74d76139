//! Squared-error regression tail layer

use crate::layers::{cached, Layer, LayerKind, ParamGroup, RegressionLossLayer};
use crate::volume::{Dims, SharedVolume};

/// Identity forward with an L2 loss against real-valued targets.
pub struct RegressionLayer {
    input: Dims,
    output: Dims,
    in_act: Option<SharedVolume>,
}

impl RegressionLayer {
    pub fn new(input: Dims) -> Self {
        Self {
            input,
            output: Dims::flat(input.size()),
            in_act: None,
        }
    }
}

impl Layer for RegressionLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Regression
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
        panic!("Unsupported operation: backward on regression layer");
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }

    fn as_regression_mut(&mut self) -> Option<&mut dyn RegressionLossLayer> {
        Some(self)
    }
}

impl RegressionLossLayer for RegressionLayer {
    fn multi_dimensional_loss(&mut self, targets: &[f64]) -> f64 {
        let mut input = cached(&self.in_act, LayerKind::Regression).borrow_mut();
        assert_eq!(
            targets.len(),
            input.len(),
            "regression target len {} does not match output len {}",
            targets.len(),
            input.len()
        );
        input.zero_grad();

        let mut loss = 0.0;
        for (i, &target) in targets.iter().enumerate() {
            let dy = input.get_by_index(i) - target;
            input.set_grad_by_index(i, dy);
            loss += 0.5 * dy * dy;
        }
        loss
    }

    fn dimensional_loss(&mut self, index: usize, value: f64) -> f64 {
        let mut input = cached(&self.in_act, LayerKind::Regression).borrow_mut();
        assert!(
            index < input.len(),
            "regression index {} out of range for {} outputs",
            index,
            input.len()
        );
        input.zero_grad();

        let dy = input.get_by_index(index) - value;
        input.set_grad_by_index(index, dy);
        0.5 * dy * dy
    }
}
