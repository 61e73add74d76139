// Tests for backward propagation through individual layers and whole networks.
// Known-value checks here; finite-difference checks live in test_gradient_checking.rs.

use proptest::prelude::*;
use reticulum::architecture::LayerDef;
use reticulum::layers::{
    FullyConnectedConfig, FullyConnectedLayer, Layer, LayerKind, ReluLayer, SigmoidLayer,
    TanhLayer,
};
use reticulum::utils::NetRng;
use reticulum::volume::{shared, Dims, Volume};
use reticulum::Network;

fn run_backward(layer: &mut dyn Layer, input: Vec<f64>, upstream: &[f64]) -> Vec<f64> {
    let input = shared(Volume::from_vec(input));
    let out = layer.forward(input.clone(), true);
    out.borrow_mut().gradients_mut().copy_from_slice(upstream);
    layer.backward();
    let grads = input.borrow().gradients().to_vec();
    grads
}

// ============================================================================
// Elementwise layers
// ============================================================================

proptest! {
    #[test]
    fn test_relu_backward_gates_on_output(
        pairs in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 1..32)
    ) {
        let (x, upstream): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let mut layer = ReluLayer::new(Dims::flat(x.len()));
        let grads = run_backward(&mut layer, x.clone(), &upstream);

        for i in 0..x.len() {
            let expected = if x[i] <= 0.0 { 0.0 } else { upstream[i] };
            prop_assert_eq!(grads[i], expected);
        }
    }
}

#[test]
fn test_sigmoid_backward_uses_output() {
    let mut layer = SigmoidLayer::new(Dims::flat(3));
    let x = vec![-2.0, 0.0, 3.0];
    let grads = run_backward(&mut layer, x.clone(), &[1.0, 1.0, 2.0]);

    for (i, &xi) in x.iter().enumerate() {
        let y = 1.0 / (1.0 + (-xi).exp());
        let upstream = if i == 2 { 2.0 } else { 1.0 };
        assert!((grads[i] - upstream * y * (1.0 - y)).abs() < 1e-12);
    }
}

#[test]
fn test_tanh_backward_uses_output() {
    let mut layer = TanhLayer::new(Dims::flat(2));
    let grads = run_backward(&mut layer, vec![0.5, -1.5], &[1.0, -1.0]);
    assert!((grads[0] - (1.0 - 0.5f64.tanh().powi(2))).abs() < 1e-12);
    assert!((grads[1] + (1.0 - 1.5f64.tanh().powi(2))).abs() < 1e-12);
}

#[test]
fn test_input_gradient_is_rewritten_each_pass() {
    let mut layer = ReluLayer::new(Dims::flat(2));
    let input = shared(Volume::from_vec(vec![1.0, 1.0]));
    for _ in 0..3 {
        let out = layer.forward(input.clone(), true);
        out.borrow_mut().gradients_mut().copy_from_slice(&[2.0, 3.0]);
        layer.backward();
    }
    assert_eq!(input.borrow().gradients(), &[2.0, 3.0]);
}

// ============================================================================
// Fully connected
// ============================================================================

#[test]
fn test_fc_backward_shapes() {
    let mut rng = NetRng::new(42);
    let mut layer =
        FullyConnectedLayer::new(Dims::new(2, 2, 2), &FullyConnectedConfig::new(3), &mut rng).unwrap();
    let input = shared(Volume::random(2, 2, 2, &mut rng));
    let out = layer.forward(input.clone(), true);
    out.borrow_mut().gradients_mut().fill(1.0);
    layer.backward();

    // dx = sum of all filters when upstream is all ones
    let mut expected = vec![0.0; 8];
    for filter in layer.filters() {
        for (e, w) in expected.iter_mut().zip(filter.weights()) {
            *e += w;
        }
    }
    for (g, e) in input.borrow().gradients().iter().zip(&expected) {
        assert!((g - e).abs() < 1e-12);
    }
    assert_eq!(layer.biases().gradients(), &[1.0, 1.0, 1.0]);
}

// ============================================================================
// Network sweeps
// ============================================================================

#[test]
fn test_network_backward_reaches_input() {
    let defs = vec![
        LayerDef::input(1, 1, 3),
        LayerDef::fc(4),
        LayerDef::new(LayerKind::Tanh),
        LayerDef::fc(2),
        LayerDef::new(LayerKind::SoftMax),
    ];
    let mut net = Network::new(&defs, &mut NetRng::new(8)).unwrap();
    let input = shared(Volume::from_vec(vec![0.2, -0.4, 0.9]));

    net.forward_shared(input.clone(), true);
    let loss = net.backward(1);

    assert!(loss > 0.0);
    assert!(input.borrow().gradients().iter().any(|&g| g != 0.0));
}

#[test]
fn test_network_regression_losses() {
    let defs = vec![
        LayerDef::input(1, 1, 2),
        LayerDef::fc(2),
        LayerDef::new(LayerKind::Regression),
    ];
    let mut net = Network::new(&defs, &mut NetRng::new(8)).unwrap();

    let out = net.forward(Volume::from_vec(vec![1.0, 1.0]), true);
    let prediction = out.borrow().weights().to_vec();

    let loss = net.multi_dimensional_loss(&[0.0, 0.0]);
    let expected: f64 = prediction.iter().map(|p| 0.5 * p * p).sum();
    assert!((loss - expected).abs() < 1e-12);

    net.forward(Volume::from_vec(vec![1.0, 1.0]), true);
    let loss = net.dimensional_loss(1, 0.0);
    assert!((loss - 0.5 * prediction[1] * prediction[1]).abs() < 1e-12);
}

#[test]
fn test_cost_loss_matches_softmax() {
    let defs = vec![
        LayerDef::input(1, 1, 2),
        LayerDef::fc(3),
        LayerDef::new(LayerKind::SoftMax),
    ];
    let mut net = Network::new(&defs, &mut NetRng::new(21)).unwrap();
    let probs = net
        .forward(Volume::from_vec(vec![0.1, 0.2]), false)
        .borrow()
        .weights()
        .to_vec();

    let loss = net.cost_loss(Volume::from_vec(vec![0.1, 0.2]), 2);
    assert!((loss + probs[2].ln()).abs() < 1e-12);
}

#[test]
#[should_panic(expected = "Unsupported operation")]
fn test_class_loss_on_regression_tail() {
    let defs = vec![
        LayerDef::input(1, 1, 2),
        LayerDef::fc(2),
        LayerDef::new(LayerKind::Regression),
    ];
    let mut net = Network::new(&defs, &mut NetRng::new(8)).unwrap();
    net.forward(Volume::from_vec(vec![1.0, 1.0]), true);
    net.backward(0);
}

#[test]
#[should_panic(expected = "Unsupported operation")]
fn test_regression_loss_on_svm_tail() {
    let defs = vec![
        LayerDef::input(1, 1, 2),
        LayerDef::fc(2),
        LayerDef::new(LayerKind::Svm),
    ];
    let mut net = Network::new(&defs, &mut NetRng::new(8)).unwrap();
    net.forward(Volume::from_vec(vec![1.0, 1.0]), true);
    net.multi_dimensional_loss(&[0.0, 1.0]);
}

#[test]
#[should_panic(expected = "out of range")]
fn test_class_index_out_of_range() {
    let defs = vec![
        LayerDef::input(1, 1, 2),
        LayerDef::fc(2),
        LayerDef::new(LayerKind::SoftMax),
    ];
    let mut net = Network::new(&defs, &mut NetRng::new(8)).unwrap();
    net.forward(Volume::from_vec(vec![1.0, 1.0]), true);
    net.backward(2);
}
