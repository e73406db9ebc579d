//! Finite-difference gradient checks shared by the layer tests.

use crate::layers::layer::{Layer, Mode};
use crate::math::tensor::Tensor;

pub const TRAIN: Mode = Mode { training: true, track_grad: true };

const EPS: f64 = 1e-6;
const TOL: f64 = 1e-4;

/// Fixed, non-uniform upstream gradient so every output position matters.
fn upstream(shape: &[usize]) -> Tensor {
    let n: usize = shape.iter().product();
    let data = (0..n).map(|i| ((i % 7) as f64) * 0.1 - 0.3).collect();
    Tensor::from_vec(shape, data).unwrap()
}

fn objective(layer: &mut dyn Layer, input: &Tensor, weights: &Tensor) -> f64 {
    let out = layer.forward(input, TRAIN).unwrap();
    out.data.iter().zip(&weights.data).map(|(a, b)| a * b).sum()
}

fn assert_close(analytic: f64, numeric: f64, what: &str, idx: usize) {
    let scale = analytic.abs().max(numeric.abs()).max(1.0);
    assert!(
        (analytic - numeric).abs() / scale < TOL,
        "{} gradient mismatch at {}: analytic {} vs numeric {}",
        what, idx, analytic, numeric
    );
}

pub fn check_input_gradient(layer: &mut dyn Layer, input: &Tensor) {
    let out = layer.forward(input, TRAIN).unwrap();
    let r = upstream(&out.shape);
    let analytic = layer.backward(&r).unwrap();
    assert_eq!(analytic.shape, input.shape);

    for idx in 0..input.numel() {
        let mut plus = input.clone();
        plus.data[idx] += EPS;
        let mut minus = input.clone();
        minus.data[idx] -= EPS;
        let numeric = (objective(layer, &plus, &r) - objective(layer, &minus, &r)) / (2.0 * EPS);
        assert_close(analytic.data[idx], numeric, "input", idx);
    }
}

fn nudge(layer: &mut dyn Layer, param: usize, idx: usize, delta: f64) {
    let mut params = layer.params_mut();
    params[param].1.value.data[idx] += delta;
}

pub fn check_param_gradient(layer: &mut dyn Layer, input: &Tensor) {
    for (_, p) in layer.params_mut() {
        p.zero_grad();
    }
    let out = layer.forward(input, TRAIN).unwrap();
    let r = upstream(&out.shape);
    layer.backward(&r).unwrap();
    let analytic: Vec<Tensor> = layer.params().iter().map(|(_, p)| p.grad.clone()).collect();
    assert!(!analytic.is_empty());

    for (pi, grads) in analytic.iter().enumerate() {
        for idx in 0..grads.numel() {
            nudge(layer, pi, idx, EPS);
            let plus = objective(layer, input, &r);
            nudge(layer, pi, idx, -2.0 * EPS);
            let minus = objective(layer, input, &r);
            nudge(layer, pi, idx, EPS);
            assert_close(grads.data[idx], (plus - minus) / (2.0 * EPS), "param", idx);
        }
    }
}
