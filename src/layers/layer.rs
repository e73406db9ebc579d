use crate::error::Result;
use crate::layers::param::Param;
use crate::math::tensor::Tensor;

/// Forward-pass mode shared by every layer of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    /// Training mode enables dropout.
    pub training: bool,
    /// When false, layers skip caching the values `backward` needs.
    pub track_grad: bool,
}

/// One differentiable stage of a network.
pub trait Layer {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor>;

    /// Accumulates parameter gradients and returns dL/d(input).
    ///
    /// Fails if the last forward pass ran without gradient tracking.
    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor>;

    fn params(&self) -> Vec<(&'static str, &Param)> {
        Vec::new()
    }

    fn params_mut(&mut self) -> Vec<(&'static str, &mut Param)> {
        Vec::new()
    }
}

pub(crate) fn no_cached_forward(layer: &str) -> crate::error::Error {
    crate::error::Error::Model(format!(
        "{} backward called without a recorded forward pass",
        layer
    ))
}
