//! Scalar activation functions and their derivatives
//!
//! Derivatives take the activation's *output* rather than its input, since
//! that is what the elementwise layers cache from the forward pass.

/// Sigmoid activation: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming y = sigmoid(x).
pub fn sigmoid_derivative(y: f64) -> f64 {
    y * (1.0 - y)
}

/// Tanh derivative assuming y = tanh(x).
pub fn tanh_derivative(y: f64) -> f64 {
    1.0 - y * y
}

/// Rectified linear unit.
pub fn relu(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

/// Index and value of the largest element (first one wins on ties).
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    let mut iter = values.iter().copied().enumerate();
    let first = iter.next()?;
    Some(iter.fold(first, |best, (i, v)| if v > best.1 { (i, v) } else { best }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_sigmoid_derivative_at_half() {
        assert!((sigmoid_derivative(0.5) - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_tanh_derivative() {
        assert!((tanh_derivative(0.0) - 1.0).abs() < EPSILON);
        assert!((tanh_derivative(0.5) - 0.75).abs() < EPSILON);
    }

    #[test]
    fn test_relu_mixed() {
        let data: Vec<f64> = [-2.0, -1.0, 0.0, 1.0, 2.0].iter().map(|&x| relu(x)).collect();
        assert_eq!(data, vec![0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
        assert_eq!(argmax(&[3.0, 3.0]), Some((0, 3.0)));
        assert_eq!(argmax(&[]), None);
    }
}
