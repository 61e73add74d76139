//! Maxout layer implementation
//!
//! Consecutive groups of `group_size` depth slices are collapsed into one by
//! taking the elementwise maximum.

use crate::error::{Error, Result};
use crate::layers::{cached, Layer, LayerKind, ParamGroup};
use crate::volume::{shared, Dims, SharedVolume, Volume};
use serde::{Deserialize, Serialize};

/// Configuration for a maxout layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxoutConfig {
    /// Number of input slices per output slice (default 2)
    pub group_size: usize,
}

impl Default for MaxoutConfig {
    fn default() -> Self {
        Self { group_size: 2 }
    }
}

impl MaxoutConfig {
    pub fn new(group_size: usize) -> Self {
        Self { group_size }
    }

    /// # Errors
    ///
    /// Returns an error if `group_size` is zero or does not divide the input depth.
    pub fn output_dims(&self, input: Dims) -> Result<Dims> {
        if self.group_size == 0 {
            return Err(Error::definition("maxout group_size must be greater than 0"));
        }
        if input.depth % self.group_size != 0 {
            return Err(Error::definition(format!(
                "maxout group_size {} does not divide input depth {}",
                self.group_size, input.depth
            )));
        }
        Ok(Dims::new(input.sx, input.sy, input.depth / self.group_size))
    }
}

pub struct MaxoutLayer {
    input: Dims,
    output: Dims,
    group_size: usize,
    /// Flat input index of the winner of each output element.
    switches: Vec<usize>,
    in_act: Option<SharedVolume>,
    out_act: Option<SharedVolume>,
}

impl MaxoutLayer {
    /// # Errors
    ///
    /// See [`MaxoutConfig::output_dims`].
    pub fn new(input: Dims, config: &MaxoutConfig) -> Result<Self> {
        let output = config.output_dims(input)?;
        Ok(Self {
            input,
            output,
            group_size: config.group_size,
            switches: vec![0; output.size()],
            in_act: None,
            out_act: None,
        })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }
}

impl Layer for MaxoutLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Maxout
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
            assert_eq!(
                vol.dims(),
                self.input,
                "maxout input mismatch: expected {}, got {}",
                self.input,
                vol.dims()
            );

            for y in 0..self.output.sy {
                for x in 0..self.output.sx {
                    for d in 0..self.output.depth {
                        let first = vol.index(x, y, d * self.group_size);
                        let (mut best_ix, mut best) = (first, vol.get_by_index(first));
                        for g in 1..self.group_size {
                            let ix = vol.index(x, y, d * self.group_size + g);
                            let v = vol.get_by_index(ix);
                            if v > best {
                                best = v;
                                best_ix = ix;
                            }
                        }
                        let n = out.index(x, y, d);
                        out.set_by_index(n, best);
                        self.switches[n] = best_ix;
                    }
                }
            }
        }

        let out = shared(out);
        self.in_act = Some(input);
        self.out_act = Some(out.clone());
        out
    }

    fn backward(&mut self) {
        let output = cached(&self.out_act, LayerKind::Maxout).borrow();
        let mut input = cached(&self.in_act, LayerKind::Maxout).borrow_mut();
        input.zero_grad();

        for (n, &ix) in self.switches.iter().enumerate() {
            input.add_grad_by_index(ix, output.get_grad_by_index(n));
        }
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}
