//! Training loop step: forward, loss, backward and batched parameter updates

use crate::config::TrainerOptions;
use crate::error::Result;
use crate::layers::ParamGroup;
use crate::network::Network;
use crate::optimizers::{Accumulators, Optimizer};
use crate::volume::Volume;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// What a training step supervises the network's output against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    /// Class index for a softmax or svm tail.
    Label(usize),
    /// Full target vector for a regression tail.
    Regression(&'a [f64]),
    /// A single supervised output dimension for a regression tail.
    Dimension { index: usize, value: f64 },
}

/// Timings and losses of one training step.
///
/// The decay losses are only computed on steps that apply an update and are
/// zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrainingResult {
    pub forward_time: Duration,
    pub backward_time: Duration,
    pub l1_decay_loss: f64,
    pub l2_decay_loss: f64,
    pub cost_loss: f64,
    pub total_loss: f64,
}

/// Drives a [`Network`] through training steps and owns the optimizer state.
///
/// # Example
///
/// ```
/// use reticulum::architecture::LayerDef;
/// use reticulum::layers::LayerKind;
/// use reticulum::utils::NetRng;
/// use reticulum::volume::Volume;
/// use reticulum::{Network, Target, Trainer, TrainerOptions};
///
/// let defs = vec![
///     LayerDef::input(1, 1, 2),
///     LayerDef::fc(2),
///     LayerDef::new(LayerKind::SoftMax),
/// ];
/// let net = Network::new(&defs, &mut NetRng::new(1)).unwrap();
/// let mut trainer = Trainer::new(net, TrainerOptions::default()).unwrap();
///
/// let result = trainer.train(Volume::from_vec(vec![1.0, 0.0]), Target::Label(0));
/// assert!(result.cost_loss > 0.0);
/// assert_eq!(trainer.iteration(), 1);
/// ```
pub struct Trainer {
    network: Network,
    options: TrainerOptions,
    optimizer: Box<dyn Optimizer>,
    k: usize,
    accumulators: Vec<Accumulators>,
}

impl Trainer {
    /// # Errors
    ///
    /// Returns [`crate::Error::Options`] if `options` fail validation.
    pub fn new(network: Network, options: TrainerOptions) -> Result<Self> {
        options.validate()?;
        let optimizer = options.method.optimizer(&options);
        debug!(
            method = %options.method,
            learning_rate = options.learning_rate,
            batch_size = options.batch_size,
            "trainer created"
        );
        Ok(Self {
            network,
            options,
            optimizer,
            k: 0,
            accumulators: Vec::new(),
        })
    }

    /// Runs one training step.
    ///
    /// The loss gradient is always propagated; parameters only change on
    /// steps where the iteration counter is a multiple of the batch size.
    ///
    /// # Panics
    ///
    /// Panics if `target` does not fit the network's tail layer.
    pub fn train(&mut self, input: Volume, target: Target<'_>) -> TrainingResult {
        let start = Instant::now();
        self.network.forward(input, true);
        let forward_time = start.elapsed();

        let start = Instant::now();
        let cost_loss = match target {
            Target::Label(class_index) => self.network.backward(class_index),
            Target::Regression(targets) => self.network.multi_dimensional_loss(targets),
            Target::Dimension { index, value } => self.network.dimensional_loss(index, value),
        };
        let backward_time = start.elapsed();

        self.k += 1;
        let (l1_decay_loss, l2_decay_loss) = if self.k % self.options.batch_size == 0 {
            self.update()
        } else {
            (0.0, 0.0)
        };

        let result = TrainingResult {
            forward_time,
            backward_time,
            l1_decay_loss,
            l2_decay_loss,
            cost_loss,
            total_loss: cost_loss + l1_decay_loss + l2_decay_loss,
        };
        trace!(
            iteration = self.k,
            cost_loss,
            total_loss = result.total_loss,
            forward_us = forward_time.as_micros() as u64,
            backward_us = backward_time.as_micros() as u64,
            "training step"
        );
        result
    }

    /// Applies decay, averages over the batch and runs the optimizer on every
    /// parameter group, then clears the consumed gradients.
    fn update(&mut self) -> (f64, f64) {
        let groups = self.network.response();
        if self.accumulators.is_empty() {
            self.accumulators = groups
                .iter()
                .map(|group| Accumulators::new(group.weights.len(), self.options.method))
                .collect();
        }
        assert_eq!(
            groups.len(),
            self.accumulators.len(),
            "parameter groups changed between updates"
        );
        debug!(iteration = self.k, groups = groups.len(), "applying update");

        let batch_size = self.options.batch_size as f64;
        let mut l1_decay_loss = 0.0;
        let mut l2_decay_loss = 0.0;
        let mut scratch = Vec::new();

        for (group, state) in groups.into_iter().zip(self.accumulators.iter_mut()) {
            let ParamGroup {
                weights,
                gradients,
                l1_decay_mul,
                l2_decay_mul,
            } = group;
            let l1_decay = self.options.l1_decay * l1_decay_mul;
            let l2_decay = self.options.l2_decay * l2_decay_mul;

            scratch.clear();
            for (&p, &raw) in weights.iter().zip(gradients.iter()) {
                l2_decay_loss += l2_decay * p * p / 2.0;
                l1_decay_loss += l1_decay * p.abs();

                let l1_grad = l1_decay * if p > 0.0 { 1.0 } else { -1.0 };
                let l2_grad = l2_decay * p;
                scratch.push((l2_grad + l1_grad + raw) / batch_size);
            }

            self.optimizer.update(self.k, weights, &scratch, state);
            gradients.fill(0.0);
        }

        (l1_decay_loss, l2_decay_loss)
    }

    /// Number of training steps taken so far.
    pub fn iteration(&self) -> usize {
        self.k
    }

    pub fn options(&self) -> &TrainerOptions {
        &self.options
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Per-group optimizer history; empty until the first update.
    pub fn accumulators(&self) -> &[Accumulators] {
        &self.accumulators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::LayerDef;
    use crate::error::Error;
    use crate::layers::{Layer, LayerKind};
    use crate::optimizers::Method;
    use crate::utils::NetRng;

    fn regression_net() -> Network {
        let defs = vec![
            LayerDef::input(1, 1, 2),
            LayerDef::fc(1),
            LayerDef::new(LayerKind::Regression),
        ];
        Network::new(&defs, &mut NetRng::new(3)).unwrap()
    }

    fn weights(trainer: &mut Trainer) -> Vec<f64> {
        trainer
            .network_mut()
            .response()
            .iter()
            .flat_map(|g| g.weights.iter().copied())
            .collect()
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = TrainerOptions {
            batch_size: 0,
            ..TrainerOptions::default()
        };
        assert!(matches!(
            Trainer::new(regression_net(), options),
            Err(Error::Options(_))
        ));
    }

    #[test]
    fn test_accumulators_allocated_lazily() {
        let options = TrainerOptions {
            batch_size: 2,
            ..TrainerOptions::with_method(Method::Adam)
        };
        let mut trainer = Trainer::new(regression_net(), options).unwrap();
        let input = || Volume::from_vec(vec![1.0, 2.0]);

        trainer.train(input(), Target::Regression(&[1.0]));
        assert!(trainer.accumulators().is_empty());

        trainer.train(input(), Target::Regression(&[1.0]));
        let acc = trainer.accumulators();
        // one weight group of 2 plus one bias group of 1
        assert_eq!(acc.len(), 2);
        assert_eq!(acc[0].gsum.len(), 2);
        assert_eq!(acc[0].xsum.len(), 2);
        assert_eq!(acc[1].gsum.len(), 1);
    }

    #[test]
    fn test_gradients_cleared_after_update() {
        let mut trainer = Trainer::new(regression_net(), TrainerOptions::default()).unwrap();
        trainer.train(Volume::from_vec(vec![1.0, 2.0]), Target::Regression(&[5.0]));
        let groups = trainer.network_mut().response();
        assert!(groups.iter().all(|g| g.gradients.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_decay_losses() {
        let options = TrainerOptions {
            learning_rate: 0.0,
            l1_decay: 0.5,
            l2_decay: 2.0,
            ..TrainerOptions::default()
        };
        let mut trainer = Trainer::new(regression_net(), options).unwrap();
        let before = weights(&mut trainer);
        let result = trainer.train(Volume::from_vec(vec![1.0, 2.0]), Target::Dimension { index: 0, value: 0.0 });

        // fc weights use l1 mul 0 and l2 mul 1; the bias group is exempt
        let expected_l2: f64 = before[..2].iter().map(|w| 2.0 * w * w / 2.0).sum();
        assert_eq!(result.l1_decay_loss, 0.0);
        assert!((result.l2_decay_loss - expected_l2).abs() < 1e-12);
        assert!(
            (result.total_loss - (result.cost_loss + result.l2_decay_loss)).abs() < 1e-12
        );
        assert_eq!(weights(&mut trainer), before);
    }

    #[test]
    fn test_batch_average() {
        // two identical steps in one batch move the weights as one step would
        let options = TrainerOptions {
            momentum: 0.0,
            learning_rate: 0.1,
            ..TrainerOptions::default()
        };
        let mut single = Trainer::new(regression_net(), options.clone()).unwrap();
        let mut batched = Trainer::new(
            regression_net(),
            TrainerOptions {
                batch_size: 2,
                ..options
            },
        )
        .unwrap();

        let x = || Volume::from_vec(vec![0.5, -1.0]);
        single.train(x(), Target::Regression(&[2.0]));
        batched.train(x(), Target::Regression(&[2.0]));
        batched.train(x(), Target::Regression(&[2.0]));

        for (a, b) in weights(&mut single).iter().zip(weights(&mut batched)) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_into_network_keeps_layers() {
        let trainer = Trainer::new(regression_net(), TrainerOptions::default()).unwrap();
        assert_eq!(trainer.network().len(), 3);
        let net = trainer.into_network();
        assert_eq!(net.layers()[1].kind(), LayerKind::FullyConnected);
    }
}
