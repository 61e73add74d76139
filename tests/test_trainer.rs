//! Tests for the trainer
//!
//! This file tests training steps end to end:
//! - Batching: parameters change only on batch boundaries
//! - Every optimizer method reduces the loss on a small regression problem
//! - Regression, single-dimension and classification targets
//! - Weight decay accounting and optimizer state allocation

use reticulum::architecture::{LayerConfig, LayerDef};
use reticulum::layers::{FullyConnectedConfig, LayerKind};
use reticulum::optimizers::Method;
use reticulum::utils::NetRng;
use reticulum::{Network, Target, Trainer, TrainerOptions, Volume};

fn regression_net(outputs: usize, seed: u64) -> Network {
    let defs = vec![
        LayerDef::input(1, 1, 2),
        LayerDef::fc(outputs),
        LayerDef::new(LayerKind::Regression),
    ];
    Network::new(&defs, &mut NetRng::new(seed)).unwrap()
}

fn all_weights(trainer: &mut Trainer) -> Vec<f64> {
    trainer
        .network_mut()
        .response()
        .iter()
        .flat_map(|g| g.weights.to_vec())
        .collect()
}

fn sample() -> Volume {
    Volume::from_vec(vec![1.0, 2.0])
}

// ============================================================================
// Batching
// ============================================================================

mod batching_tests {
    use super::*;

    #[test]
    fn test_weights_change_only_on_batch_boundary() {
        let options = TrainerOptions {
            batch_size: 3,
            learning_rate: 0.05,
            ..TrainerOptions::default()
        };
        let mut trainer = Trainer::new(regression_net(1, 4), options).unwrap();
        let mut previous = all_weights(&mut trainer);

        for step in 1..=7 {
            let result = trainer.train(sample(), Target::Regression(&[5.0]));
            assert!(result.cost_loss > 0.0, "cost missing at step {}", step);

            let current = all_weights(&mut trainer);
            if step % 3 == 0 {
                assert_ne!(current, previous, "no update at step {}", step);
            } else {
                assert_eq!(current, previous, "unexpected update at step {}", step);
            }
            previous = current;
        }
        assert_eq!(trainer.iteration(), 7);
    }

    #[test]
    fn test_cost_loss_mid_batch_leaves_update_unchanged() {
        let defs = vec![
            LayerDef::input(1, 1, 2),
            LayerDef::fc(3),
            LayerDef::new(LayerKind::SoftMax),
        ];
        let options = TrainerOptions {
            batch_size: 2,
            momentum: 0.0,
            learning_rate: 0.1,
            ..TrainerOptions::default()
        };
        let mut plain =
            Trainer::new(Network::new(&defs, &mut NetRng::new(13)).unwrap(), options.clone()).unwrap();
        let mut scored =
            Trainer::new(Network::new(&defs, &mut NetRng::new(13)).unwrap(), options).unwrap();

        plain.train(sample(), Target::Label(0));
        plain.train(Volume::from_vec(vec![0.5, -1.0]), Target::Label(2));

        scored.train(sample(), Target::Label(0));
        let loss = scored
            .network_mut()
            .cost_loss(Volume::from_vec(vec![-3.0, 2.0]), 1);
        assert!(loss > 0.0);
        scored.train(Volume::from_vec(vec![0.5, -1.0]), Target::Label(2));

        assert_eq!(all_weights(&mut scored), all_weights(&mut plain));
    }

    #[test]
    fn test_decay_loss_only_reported_on_update() {
        let options = TrainerOptions {
            batch_size: 2,
            l2_decay: 0.1,
            ..TrainerOptions::default()
        };
        let mut trainer = Trainer::new(regression_net(2, 4), options).unwrap();

        let first = trainer.train(sample(), Target::Regression(&[1.0, 1.0]));
        assert_eq!(first.l2_decay_loss, 0.0);
        assert_eq!(first.total_loss, first.cost_loss);

        let second = trainer.train(sample(), Target::Regression(&[1.0, 1.0]));
        assert!(second.l2_decay_loss > 0.0);
        assert!(
            (second.total_loss - second.cost_loss - second.l2_decay_loss).abs() < 1e-12
        );
    }
}

// ============================================================================
// Optimizer methods
// ============================================================================

mod method_tests {
    use super::*;

    fn loss_reduction(options: TrainerOptions) -> (f64, f64) {
        let mut trainer = Trainer::new(regression_net(1, 21), options).unwrap();
        let first = trainer.train(sample(), Target::Regression(&[5.0])).cost_loss;
        let mut last = first;
        for _ in 0..199 {
            last = trainer.train(sample(), Target::Regression(&[5.0])).cost_loss;
        }
        (first, last)
    }

    #[test]
    fn test_every_method_reduces_loss() {
        let cases = [
            (Method::Sgd, 0.01, 1e-8),
            (Method::Nesterov, 0.01, 1e-8),
            (Method::Adagrad, 0.1, 1e-8),
            (Method::Windowgrad, 0.01, 1e-8),
            (Method::Adadelta, 1.0, 1e-6),
            (Method::Adam, 0.01, 1e-8),
        ];
        for (method, learning_rate, eps) in cases {
            let options = TrainerOptions {
                learning_rate,
                eps,
                ..TrainerOptions::with_method(method)
            };
            let (first, last) = loss_reduction(options);
            assert!(
                last < 0.75 * first,
                "{} did not learn: {} -> {}",
                method,
                first,
                last
            );
        }
    }

    #[test]
    fn test_accumulator_shapes_follow_method() {
        for method in [Method::Sgd, Method::Adagrad, Method::Adadelta, Method::Adam] {
            let mut trainer =
                Trainer::new(regression_net(3, 1), TrainerOptions::with_method(method)).unwrap();
            assert!(trainer.accumulators().is_empty());
            trainer.train(sample(), Target::Regression(&[0.0, 0.0, 0.0]));

            let acc = trainer.accumulators();
            // three filters of two weights, then the bias group
            assert_eq!(acc.len(), 4);
            assert_eq!(acc[3].gsum.len(), 3);
            let expected_xsum = if method.uses_xsum() { 2 } else { 0 };
            assert_eq!(acc[0].xsum.len(), expected_xsum, "{}", method);
        }
    }
}

// ============================================================================
// Targets
// ============================================================================

mod target_tests {
    use super::*;

    #[test]
    fn test_dimension_target_updates_one_output() {
        let options = TrainerOptions {
            momentum: 0.0,
            learning_rate: 0.1,
            ..TrainerOptions::default()
        };
        let mut trainer = Trainer::new(regression_net(2, 8), options).unwrap();
        let before: Vec<Vec<f64>> = trainer
            .network_mut()
            .response()
            .iter()
            .map(|g| g.weights.to_vec())
            .collect();

        trainer.train(sample(), Target::Dimension { index: 1, value: 3.0 });
        let after: Vec<Vec<f64>> = trainer
            .network_mut()
            .response()
            .iter()
            .map(|g| g.weights.to_vec())
            .collect();

        assert_eq!(after[0], before[0]);
        assert_ne!(after[1], before[1]);
        assert_eq!(after[2][0], before[2][0]);
        assert_ne!(after[2][1], before[2][1]);
    }

    #[test]
    fn test_svm_label_target() {
        let defs = vec![
            LayerDef::input(1, 1, 2),
            LayerDef::fc(3),
            LayerDef::new(LayerKind::Svm),
        ];
        let net = Network::new(&defs, &mut NetRng::new(2)).unwrap();
        let options = TrainerOptions {
            learning_rate: 0.05,
            ..TrainerOptions::default()
        };
        let mut trainer = Trainer::new(net, options).unwrap();

        let mut loss = f64::INFINITY;
        for _ in 0..100 {
            loss = trainer.train(sample(), Target::Label(2)).cost_loss;
        }
        assert_eq!(loss, 0.0);
        assert_eq!(trainer.network().prediction(), 2);
    }

    #[test]
    #[should_panic(expected = "Unsupported operation")]
    fn test_label_target_on_regression_net() {
        let mut trainer = Trainer::new(regression_net(2, 1), TrainerOptions::default()).unwrap();
        trainer.train(sample(), Target::Label(0));
    }
}

// ============================================================================
// Weight decay
// ============================================================================

mod decay_tests {
    use super::*;

    #[test]
    fn test_l1_decay_uses_layer_multiplier() {
        let fc = LayerConfig::FullyConnected(FullyConnectedConfig {
            l1_decay_mul: 1.0,
            l2_decay_mul: 0.0,
            ..FullyConnectedConfig::new(2)
        });
        let defs = vec![
            LayerDef::input(1, 1, 2),
            LayerDef::with_config(fc),
            LayerDef::new(LayerKind::Regression),
        ];
        let net = Network::new(&defs, &mut NetRng::new(6)).unwrap();
        let options = TrainerOptions {
            learning_rate: 0.0,
            l1_decay: 0.5,
            l2_decay: 3.0,
            ..TrainerOptions::default()
        };
        let mut trainer = Trainer::new(net, options).unwrap();
        let filters: Vec<f64> = all_weights(&mut trainer)[..4].to_vec();

        let result = trainer.train(sample(), Target::Regression(&[0.0, 0.0]));
        let expected: f64 = filters.iter().map(|w| 0.5 * w.abs()).sum();
        assert!((result.l1_decay_loss - expected).abs() < 1e-12);
        assert_eq!(result.l2_decay_loss, 0.0);
    }

    #[test]
    fn test_l2_decay_shrinks_weights_without_loss_gradient() {
        // an exact target gives zero cost gradient, leaving decay alone
        let options = TrainerOptions {
            momentum: 0.0,
            learning_rate: 0.1,
            l2_decay: 1.0,
            ..TrainerOptions::default()
        };
        let mut trainer = Trainer::new(regression_net(1, 5), options).unwrap();
        let out = trainer.network_mut().forward(sample(), false);
        let exact = out.borrow().weights()[0];
        let before = all_weights(&mut trainer);

        trainer.train(sample(), Target::Regression(&[exact]));
        let after = all_weights(&mut trainer);
        for i in 0..2 {
            assert!((after[i] - 0.9 * before[i]).abs() < 1e-12);
        }
        assert_eq!(after[2], before[2]);
    }
}
