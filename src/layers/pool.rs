//! Max pooling layer implementation
//!
//! Pooling slides a `sx × sy` window over each depth slice independently and
//! keeps the largest value. The position of the winner is recorded so the
//! backward pass can route the whole upstream gradient to it.

use crate::error::{Error, Result};
use crate::layers::conv2d::window_count;
use crate::layers::{cached, Layer, LayerKind, ParamGroup};
use crate::volume::{shared, Dims, SharedVolume, Volume};
use serde::{Deserialize, Serialize};

/// Configuration for a max pooling layer.
///
/// # Example
///
/// ```json
/// { "type": "pool", "sx": 2, "stride": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Window width
    pub sx: usize,
    /// Window height (defaults to `sx`)
    pub sy: Option<usize>,
    /// Stride (defaults to `sx`, i.e. non-overlapping windows)
    pub stride: Option<usize>,
    /// Padding on every side (default 0)
    pub pad: usize,
}

impl PoolConfig {
    pub fn new(sx: usize) -> Self {
        Self {
            sx,
            ..Self::default()
        }
    }

    /// Output dimensions for a given input; depth is preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is empty, the stride is zero, or the
    /// window does not fit the padded input.
    pub fn output_dims(&self, input: Dims) -> Result<Dims> {
        let (sx, sy, stride) = self.resolved();
        if sx == 0 || sy == 0 {
            return Err(Error::definition("pool window size must be greater than 0"));
        }
        if stride == 0 {
            return Err(Error::definition("pool stride must be greater than 0"));
        }
        match (
            window_count(input.sx, sx, stride, self.pad),
            window_count(input.sy, sy, stride, self.pad),
        ) {
            (Some(ox), Some(oy)) => Ok(Dims::new(ox, oy, input.depth)),
            _ => Err(Error::definition(format!(
                "pool window {}x{} with pad {} does not fit input {}",
                sx, sy, self.pad, input
            ))),
        }
    }

    fn resolved(&self) -> (usize, usize, usize) {
        (
            self.sx,
            self.sy.unwrap_or(self.sx),
            self.stride.unwrap_or(self.sx),
        )
    }
}

/// Max pooling layer.
pub struct PoolLayer {
    input: Dims,
    output: Dims,
    sx: usize,
    sy: usize,
    stride: usize,
    pad: usize,
    /// Flat input index of each output's winner, `None` when the window held no input cell.
    switches: Vec<Option<usize>>,
    in_act: Option<SharedVolume>,
    out_act: Option<SharedVolume>,
}

impl PoolLayer {
    /// # Errors
    ///
    /// See [`PoolConfig::output_dims`].
    pub fn new(input: Dims, config: &PoolConfig) -> Result<Self> {
        let output = config.output_dims(input)?;
        let (sx, sy, stride) = config.resolved();
        Ok(Self {
            input,
            output,
            sx,
            sy,
            stride,
            pad: config.pad,
            switches: vec![None; output.size()],
            in_act: None,
            out_act: None,
        })
    }

    /// Winner positions recorded by the last forward pass, indexed like the output.
    pub fn switches(&self) -> &[Option<usize>] {
        &self.switches
    }
}

impl Layer for PoolLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Pool
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
                "pool input mismatch: expected {}, got {}",
                self.input,
                vol.dims()
            );
            let (in_sx, in_sy) = (vol.sx() as isize, vol.sy() as isize);

            for d in 0..self.output.depth {
                for ay in 0..self.output.sy {
                    let y = (self.stride * ay) as isize - self.pad as isize;
                    for ax in 0..self.output.sx {
                        let x = (self.stride * ax) as isize - self.pad as isize;

                        let mut best: Option<(usize, f64)> = None;
                        for fy in 0..self.sy as isize {
                            let oy = y + fy;
                            if oy < 0 || oy >= in_sy {
                                continue;
                            }
                            for fx in 0..self.sx as isize {
                                let ox = x + fx;
                                if ox < 0 || ox >= in_sx {
                                    continue;
                                }
                                let ix = vol.index(ox as usize, oy as usize, d);
                                let v = vol.get_by_index(ix);
                                if best.map_or(true, |(_, b)| v > b) {
                                    best = Some((ix, v));
                                }
                            }
                        }

                        let n = out.index(ax, ay, d);
                        self.switches[n] = best.map(|(ix, _)| ix);
                        out.set_by_index(n, best.map_or(0.0, |(_, v)| v));
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
        let output = cached(&self.out_act, LayerKind::Pool).borrow();
        let mut input = cached(&self.in_act, LayerKind::Pool).borrow_mut();
        input.zero_grad();

        for (n, switch) in self.switches.iter().enumerate() {
            if let Some(ix) = *switch {
                input.add_grad_by_index(ix, output.get_grad_by_index(n));
            }
        }
    }

    fn response(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}
