use crate::error::{Error, Result};
use crate::layers::layer::{no_cached_forward, Layer, Mode};
use crate::math::tensor::Tensor;

/// Row-wise log-softmax over `[N, C]` logits, giving log-probabilities.
#[derive(Debug, Default)]
pub struct LogSoftmax {
    output: Option<Tensor>,
}

impl LogSoftmax {
    pub fn new() -> LogSoftmax {
        LogSoftmax::default()
    }
}

impl Layer for LogSoftmax {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor> {
        input.expect_rank(2, "log-softmax")?;
        let n = input.shape[0];
        let mut out = input.clone();
        for i in 0..n {
            let row = input.row(i);
            // Subtract the max before exp() to stay finite.
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let log_sum = row.iter().map(|x| (x - max).exp()).sum::<f64>().ln() + max;
            let cols = input.shape[1];
            for (o, x) in out.data[i * cols..(i + 1) * cols].iter_mut().zip(row) {
                *o = x - log_sum;
            }
        }
        self.output = if mode.track_grad { Some(out.clone()) } else { None };
        Ok(out)
    }

    /// dL/dz_i = g_i - softmax_i · Σ_j g_j
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let out = self.output.as_ref().ok_or_else(|| no_cached_forward("log-softmax"))?;
        if out.shape != grad_output.shape {
            return Err(Error::ShapeMismatch(format!(
                "log-softmax gradient {:?} does not match output {:?}",
                grad_output.shape, out.shape
            )));
        }
        let n = out.shape[0];
        let mut grad = grad_output.clone();
        for i in 0..n {
            let g_sum: f64 = grad_output.row(i).iter().sum();
            let cols = out.shape[1];
            for (gz, lp) in grad.data[i * cols..(i + 1) * cols].iter_mut().zip(out.row(i)) {
                *gz -= lp.exp() * g_sum;
            }
        }
        Ok(grad)
    }
}
