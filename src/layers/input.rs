//! Input layer declaring the shape of the data fed to a network

use crate::layers::{Layer, LayerKind, ParamGroup};
use crate::volume::{Dims, SharedVolume};

/// Identity layer at the head of every network.
///
/// Its only job is to declare the input dimensions the rest of the chain is
/// built from, and to reject volumes of a different shape.
pub struct InputLayer {
    dims: Dims,
    in_act: Option<SharedVolume>,
}

impl InputLayer {
    pub fn new(dims: Dims) -> Self {
        Self { dims, in_act: None }
    }
}

impl Layer for InputLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Input
    }

    fn input_dims(&self) -> Dims {
        self.dims
    }

    fn output_dims(&self) -> Dims {
        self.dims
    }

    /// # Panics
    ///
    /// Panics if `input` does not have the declared dimensions.
    fn forward(&mut self, input: SharedVolume, _is_training: bool) -> SharedVolume {
        let dims = input.borrow().dims();
        assert_eq!(
            dims, self.dims,
            "input volume is {}, network expects {}",
            dims, self.dims
        );
        self.in_act = Some(input.clone());
        input
    }

    fn backward(&mut self) {}

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}
