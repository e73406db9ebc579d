use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::layers::layer::{no_cached_forward, Layer, Mode};
use crate::math::tensor::Tensor;

/// Inverted dropout: in training mode each element is zeroed with probability
/// `rate` and survivors are scaled by `1 / (1 - rate)`. Identity in eval mode.
#[derive(Debug)]
pub struct Dropout {
    pub rate: f64,
    rng: StdRng,
    mask: Option<Tensor>,
}

impl Dropout {
    pub fn new(rate: f64, seed: u64) -> Result<Dropout> {
        if !(0.0..1.0).contains(&rate) {
            return Err(Error::Config(format!("dropout rate {} must be in [0, 1)", rate)));
        }
        Ok(Dropout { rate, rng: StdRng::seed_from_u64(seed), mask: None })
    }
}

impl Layer for Dropout {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor> {
        let mask = if mode.training && self.rate > 0.0 {
            let keep = 1.0 - self.rate;
            let rng = &mut self.rng;
            let data = (0..input.numel())
                .map(|_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
                .collect();
            Tensor::from_vec(&input.shape, data)?
        } else {
            Tensor { shape: input.shape.clone(), data: vec![1.0; input.numel()] }
        };

        let data = input.data.iter().zip(&mask.data).map(|(x, m)| x * m).collect();
        self.mask = if mode.track_grad { Some(mask) } else { None };
        Tensor::from_vec(&input.shape, data)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let mask = self.mask.as_ref().ok_or_else(|| no_cached_forward("dropout"))?;
        if mask.shape != grad_output.shape {
            return Err(Error::ShapeMismatch(format!(
                "dropout gradient {:?} does not match input {:?}",
                grad_output.shape, mask.shape
            )));
        }
        let data = grad_output.data.iter().zip(&mask.data).map(|(g, m)| g * m).collect();
        Tensor::from_vec(&mask.shape, data)
    }
}
