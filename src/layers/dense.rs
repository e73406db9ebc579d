use rand::Rng;

use crate::error::{Error, Result};
use crate::layers::layer::{no_cached_forward, Layer, Mode};
use crate::layers::param::Param;
use crate::math::tensor::Tensor;

/// Fully connected layer: `y = x · W + b` with `W` of shape `[inputs, outputs]`.
#[derive(Debug)]
pub struct Dense {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Param,
    pub biases: Param,
    input: Option<Tensor>,
}

impl Dense {
    /// He-initialized layer, for use before a ReLU.
    pub fn he<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Dense {
        Dense::from_weights(Tensor::he(&[inputs, outputs], inputs, rng), outputs)
    }

    /// Xavier-initialized layer, for use before the log-softmax output.
    pub fn xavier<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Dense {
        Dense::from_weights(Tensor::xavier(&[inputs, outputs], inputs, rng), outputs)
    }

    fn from_weights(weights: Tensor, outputs: usize) -> Dense {
        Dense {
            inputs: weights.shape[0],
            outputs,
            weights: Param::new(weights),
            biases: Param::new(Tensor::zeros(&[outputs])),
            input: None,
        }
    }
}

impl Layer for Dense {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor> {
        input.expect_rank(2, "dense layer")?;
        if input.shape[1] != self.inputs {
            return Err(Error::ShapeMismatch(format!(
                "dense layer expects {} input features, got {}",
                self.inputs, input.shape[1]
            )));
        }
        let n = input.shape[0];
        let w = &self.weights.value.data;
        let mut out = Tensor::zeros(&[n, self.outputs]);
        for i in 0..n {
            let x = input.row(i);
            let y = &mut out.data[i * self.outputs..(i + 1) * self.outputs];
            y.copy_from_slice(&self.biases.value.data);
            for (k, &xk) in x.iter().enumerate() {
                if xk == 0.0 {
                    continue;
                }
                let w_row = &w[k * self.outputs..(k + 1) * self.outputs];
                for (yj, wkj) in y.iter_mut().zip(w_row) {
                    *yj += xk * wkj;
                }
            }
        }
        self.input = if mode.track_grad { Some(input.clone()) } else { None };
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let input = self.input.as_ref().ok_or_else(|| no_cached_forward("dense"))?;
        let n = input.shape[0];
        if grad_output.shape != [n, self.outputs] {
            return Err(Error::ShapeMismatch(format!(
                "dense gradient {:?} does not match output [{}, {}]",
                grad_output.shape, n, self.outputs
            )));
        }

        let w = &self.weights.value.data;
        let mut w_grad = Tensor::zeros(&[self.inputs, self.outputs]);
        let mut b_grad = Tensor::zeros(&[self.outputs]);
        let mut input_grad = Tensor::zeros(&[n, self.inputs]);

        for i in 0..n {
            let x = input.row(i);
            let g = grad_output.row(i);
            for (bj, gj) in b_grad.data.iter_mut().zip(g) {
                *bj += gj;
            }
            for k in 0..self.inputs {
                let w_row = &w[k * self.outputs..(k + 1) * self.outputs];
                let wg_row = &mut w_grad.data[k * self.outputs..(k + 1) * self.outputs];
                let mut acc = 0.0;
                for j in 0..self.outputs {
                    wg_row[j] += x[k] * g[j];
                    acc += g[j] * w_row[j];
                }
                input_grad.data[i * self.inputs + k] = acc;
            }
        }

        self.weights.accumulate(w_grad);
        self.biases.accumulate(b_grad);
        Ok(input_grad)
    }

    fn params(&self) -> Vec<(&'static str, &Param)> {
        vec![("weight", &self.weights), ("bias", &self.biases)]
    }

    fn params_mut(&mut self) -> Vec<(&'static str, &mut Param)> {
        vec![("weight", &mut self.weights), ("bias", &mut self.biases)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::testing::{check_input_gradient, check_param_gradient, TRAIN};
    use rand::{rngs::StdRng, SeedableRng};

    fn layer() -> Dense {
        Dense::he(3, 2, &mut StdRng::seed_from_u64(1))
    }

    fn input() -> Tensor {
        Tensor::from_vec(&[2, 3], vec![0.5, -1.0, 2.0, 1.5, 0.3, -0.7]).unwrap()
    }

    #[test]
    fn forward_applies_weights_and_bias() {
        let mut dense = layer();
        dense.weights.value =
            Tensor::from_vec(&[3, 2], vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        dense.biases.value = Tensor::from_vec(&[2], vec![0.5, -0.5]).unwrap();
        let x = Tensor::from_vec(&[1, 3], vec![1.0, 2.0, 3.0]).unwrap();
        let y = dense.forward(&x, TRAIN).unwrap();
        assert_eq!(y.data, vec![4.5, 4.5]);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let mut dense = layer();
        let x = Tensor::zeros(&[1, 4]);
        assert!(matches!(dense.forward(&x, TRAIN), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn gradients_match_finite_differences() {
        check_input_gradient(&mut layer(), &input());
        check_param_gradient(&mut layer(), &input());
    }

    #[test]
    fn backward_without_tracking_fails() {
        let mut dense = layer();
        let mode = Mode { training: false, track_grad: false };
        let y = dense.forward(&input(), mode).unwrap();
        assert!(dense.backward(&y).is_err());
    }
}
