use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::layer::{no_cached_forward, Layer, Mode};
use crate::math::tensor::Tensor;

/// Applies an element-wise activation to any tensor shape.
#[derive(Debug)]
pub struct Activation {
    pub function: ActivationFunction,
    pre_activation: Option<Tensor>, // needed for the derivative
}

impl Activation {
    pub fn new(function: ActivationFunction) -> Activation {
        Activation { function, pre_activation: None }
    }
}

impl Layer for Activation {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor> {
        let out = input.map(|x| self.function.function(x));
        self.pre_activation = if mode.track_grad { Some(input.clone()) } else { None };
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let z = self.pre_activation.as_ref().ok_or_else(|| no_cached_forward("activation"))?;
        if z.shape != grad_output.shape {
            return Err(Error::ShapeMismatch(format!(
                "activation gradient {:?} does not match input {:?}",
                grad_output.shape, z.shape
            )));
        }
        // δ = error ⊙ σ'(z)
        let data = grad_output.data.iter().zip(&z.data)
            .map(|(g, &x)| g * self.function.derivative(x))
            .collect();
        Tensor::from_vec(&z.shape, data)
    }
}
