use crate::error::Result;
use crate::layers::layer::{no_cached_forward, Layer, Mode};
use crate::math::tensor::Tensor;

/// Collapses every dimension after the batch dimension: `[N, ...] → [N, F]`.
#[derive(Debug, Default)]
pub struct Flatten {
    input_shape: Option<Vec<usize>>,
}

impl Flatten {
    pub fn new() -> Flatten {
        Flatten::default()
    }
}

impl Layer for Flatten {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor> {
        let n = input.dim(0)?;
        let features = if n == 0 { 0 } else { input.numel() / n };
        self.input_shape = if mode.track_grad { Some(input.shape.clone()) } else { None };
        input.clone().reshape(&[n, features])
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let shape = self.input_shape.as_ref().ok_or_else(|| no_cached_forward("flatten"))?;
        grad_output.clone().reshape(shape)
    }
}
