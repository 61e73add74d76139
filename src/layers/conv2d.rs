//! 2D convolutional layer implementation
//!
//! Each filter is a volume of `sx × sy × input_depth` that is cross-correlated
//! with the input at every output position. The window for output cell
//! `(ax, ay)` starts at `(stride·ax − pad, stride·ay − pad)`; window cells
//! falling outside the input contribute nothing, which is equivalent to zero
//! padding without ever materializing it.

use crate::error::{Error, Result};
use crate::layers::{cached, Layer, LayerKind, ParamGroup};
use crate::utils::NetRng;
use crate::volume::{shared, Dims, SharedVolume, Volume};
use serde::{Deserialize, Serialize};

/// Configuration for a convolutional layer.
///
/// `filters` and `sx` are required. `sy` defaults to `sx`.
///
/// # Example
///
/// ```json
/// { "type": "conv", "filters": 8, "sx": 3, "stride": 1, "pad": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvConfig {
    /// Number of filters, i.e. the output depth
    pub filters: usize,
    /// Filter width
    pub sx: usize,
    /// Filter height (defaults to `sx`)
    pub sy: Option<usize>,
    /// Stride (default 1)
    pub stride: usize,
    /// Zero padding on every side (default 0)
    pub pad: usize,
    /// Multiplier applied to the trainer's L1 decay for the filters (default 0.0)
    pub l1_decay_mul: f64,
    /// Multiplier applied to the trainer's L2 decay for the filters (default 1.0)
    pub l2_decay_mul: f64,
    /// Initial value of every bias (default 0.0)
    pub bias_pref: f64,
}

impl Default for ConvConfig {
    fn default() -> Self {
        Self {
            filters: 0,
            sx: 0,
            sy: None,
            stride: 1,
            pad: 0,
            l1_decay_mul: 0.0,
            l2_decay_mul: 1.0,
            bias_pref: 0.0,
        }
    }
}

impl ConvConfig {
    pub fn new(filters: usize, sx: usize) -> Self {
        Self {
            filters,
            sx,
            ..Self::default()
        }
    }

    /// Output dimensions for a given input.
    ///
    /// `out = floor((in + 2·pad − filter) / stride) + 1` along each axis.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is zero or the filter does not fit.
    pub fn output_dims(&self, input: Dims) -> Result<Dims> {
        if self.filters == 0 {
            return Err(Error::definition("conv layer requires filters > 0"));
        }
        if self.sx == 0 || self.sy == Some(0) {
            return Err(Error::definition("conv filter size must be greater than 0"));
        }
        if self.stride == 0 {
            return Err(Error::definition("conv stride must be greater than 0"));
        }
        let sy = self.sy.unwrap_or(self.sx);
        let out_sx = window_count(input.sx, self.sx, self.stride, self.pad);
        let out_sy = window_count(input.sy, sy, self.stride, self.pad);
        match (out_sx, out_sy) {
            (Some(ox), Some(oy)) => Ok(Dims::new(ox, oy, self.filters)),
            _ => Err(Error::definition(format!(
                "conv filter {}x{} with pad {} does not fit input {}",
                self.sx, sy, self.pad, input
            ))),
        }
    }
}

/// Number of window positions along one axis, `None` if the window never fits.
pub(crate) fn window_count(input: usize, window: usize, stride: usize, pad: usize) -> Option<usize> {
    let padded = input + 2 * pad;
    if padded < window {
        None
    } else {
        Some((padded - window) / stride + 1)
    }
}

/// Convolutional layer with learnable filters and one bias per filter.
///
/// # Example
///
/// ```ignore
/// use reticulum::layers::{ConvConfig, ConvLayer, Layer};
/// use reticulum::utils::NetRng;
/// use reticulum::volume::Dims;
///
/// let mut rng = NetRng::new(42);
/// let layer = ConvLayer::new(Dims::new(7, 7, 3), &ConvConfig::new(4, 3), &mut rng)?;
/// assert_eq!(layer.output_dims(), Dims::new(5, 5, 4));
/// ```
pub struct ConvLayer {
    input: Dims,
    output: Dims,
    stride: usize,
    pad: usize,
    l1_decay_mul: f64,
    l2_decay_mul: f64,
    filters: Vec<Volume>,
    biases: Volume,
    in_act: Option<SharedVolume>,
    out_act: Option<SharedVolume>,
}

impl ConvLayer {
    /// Create a new layer with Gaussian-initialized filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the filter does
    /// not fit the (padded) input.
    pub fn new(input: Dims, config: &ConvConfig, rng: &mut NetRng) -> Result<Self> {
        let output = config.output_dims(input)?;
        let sy = config.sy.unwrap_or(config.sx);

        let filters = (0..config.filters)
            .map(|_| Volume::random(config.sx, sy, input.depth, rng))
            .collect();

        Ok(Self {
            input,
            output,
            stride: config.stride,
            pad: config.pad,
            l1_decay_mul: config.l1_decay_mul,
            l2_decay_mul: config.l2_decay_mul,
            filters,
            biases: Volume::filled(1, 1, config.filters, config.bias_pref),
            in_act: None,
            out_act: None,
        })
    }

    pub fn filters(&self) -> &[Volume] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut [Volume] {
        &mut self.filters
    }

    pub fn biases(&self) -> &Volume {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut Volume {
        &mut self.biases
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pad(&self) -> usize {
        self.pad
    }

    /// Top-left input coordinate of the window for output position `pos`.
    fn origin(&self, pos: usize) -> isize {
        (self.stride * pos) as isize - self.pad as isize
    }
}

/// Input coordinate `origin + offset`, if it lies within `[0, len)`.
#[inline]
fn in_bounds(origin: isize, offset: usize, len: usize) -> Option<usize> {
    let coord = origin + offset as isize;
    if coord >= 0 && (coord as usize) < len {
        Some(coord as usize)
    } else {
        None
    }
}

impl Layer for ConvLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Conv
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
                "conv input mismatch: expected {}, got {}",
                self.input,
                vol.dims()
            );
            let (in_sx, in_sy) = (vol.sx(), vol.sy());

            for (d, filter) in self.filters.iter().enumerate() {
                for ay in 0..self.output.sy {
                    let y = self.origin(ay);
                    for ax in 0..self.output.sx {
                        let x = self.origin(ax);

                        let mut a = 0.0;
                        for fy in 0..filter.sy() {
                            let Some(oy) = in_bounds(y, fy, in_sy) else {
                                continue;
                            };
                            for fx in 0..filter.sx() {
                                let Some(ox) = in_bounds(x, fx, in_sx) else {
                                    continue;
                                };
                                for fd in 0..filter.depth() {
                                    a += filter.get(fx, fy, fd) * vol.get(ox, oy, fd);
                                }
                            }
                        }
                        out.set(ax, ay, d, a + self.biases.get_by_index(d));
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
        let output = cached(&self.out_act, LayerKind::Conv).borrow();
        let mut input = cached(&self.in_act, LayerKind::Conv).borrow_mut();
        input.zero_grad();

        let (in_sx, in_sy) = (input.sx(), input.sy());
        let (stride, pad) = (self.stride as isize, self.pad as isize);

        for (d, filter) in self.filters.iter_mut().enumerate() {
            for ay in 0..self.output.sy {
                let y = stride * ay as isize - pad;
                for ax in 0..self.output.sx {
                    let x = stride * ax as isize - pad;

                    let chain_grad = output.get_grad(ax, ay, d);
                    for fy in 0..filter.sy() {
                        let Some(oy) = in_bounds(y, fy, in_sy) else {
                            continue;
                        };
                        for fx in 0..filter.sx() {
                            let Some(ox) = in_bounds(x, fx, in_sx) else {
                                continue;
                            };
                            for fd in 0..filter.depth() {
                                let ix1 = input.index(ox, oy, fd);
                                let ix2 = filter.index(fx, fy, fd);
                                filter.add_grad_by_index(ix2, input.get_by_index(ix1) * chain_grad);
                                input.add_grad_by_index(ix1, filter.get_by_index(ix2) * chain_grad);
                            }
                        }
                    }
                    self.biases.add_grad_by_index(d, chain_grad);
                }
            }
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
