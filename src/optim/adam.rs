use crate::error::{Error, Result};
use crate::layers::param::Param;
use crate::math::tensor::Tensor;
use crate::optim::optimizer::Optimizer;

/// Adam with bias-corrected first and second moment estimates.
///
/// Moment buffers are created on the first `step` and matched to parameters
/// by position, so the same parameter list must be passed on every step.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: i32,
    moments: Vec<(Tensor, Tensor)>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam { learning_rate, beta1: 0.9, beta2: 0.999, eps: 1e-8, t: 0, moments: Vec::new() }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Param]) -> Result<()> {
        if self.moments.is_empty() {
            self.moments = params.iter()
                .map(|p| (Tensor::zeros(&p.value.shape), Tensor::zeros(&p.value.shape)))
                .collect();
        }
        if self.moments.len() != params.len() {
            return Err(Error::ShapeMismatch(format!(
                "adam was initialised for {} parameters, got {}",
                self.moments.len(), params.len()
            )));
        }

        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);
        let (b1, b2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.eps);

        for (p, (m, v)) in params.iter_mut().zip(self.moments.iter_mut()) {
            if m.shape != p.value.shape {
                return Err(Error::ShapeMismatch(format!(
                    "adam moment {:?} does not match parameter {:?}",
                    m.shape, p.value.shape
                )));
            }
            let Param { value, grad } = &mut **p;
            for i in 0..value.data.len() {
                let g = grad.data[i];
                m.data[i] = b1 * m.data[i] + (1.0 - b1) * g;
                v.data[i] = b2 * v.data[i] + (1.0 - b2) * g * g;
                let m_hat = m.data[i] / bias1;
                let v_hat = v.data[i] / bias2;
                value.data[i] -= lr * m_hat / (v_hat.sqrt() + eps);
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut p = Param::new(Tensor::from_vec(&[2], vec![1.0, 1.0]).unwrap());
        p.grad = Tensor::from_vec(&[2], vec![3.0, -0.01]).unwrap();
        let mut adam = Adam::new(0.1);
        adam.step(&mut [&mut p]).unwrap();
        // Bias correction makes the first step ±lr regardless of gradient scale.
        assert!((p.value.data[0] - 0.9).abs() < 1e-6);
        assert!((p.value.data[1] - 1.1).abs() < 1e-6);
    }

    #[test]
    fn rejects_changed_parameter_list() {
        let mut a = Param::new(Tensor::zeros(&[2]));
        let mut b = Param::new(Tensor::zeros(&[2]));
        let mut adam = Adam::new(0.1);
        adam.step(&mut [&mut a]).unwrap();
        assert!(adam.step(&mut [&mut a, &mut b]).is_err());
    }
}
