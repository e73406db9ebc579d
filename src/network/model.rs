use std::collections::BTreeMap;

use crate::error::Result;
use crate::layers::param::Param;
use crate::math::tensor::Tensor;

/// Flat snapshot of a model's parameters, keyed `"<layer>.<param>"`.
///
/// A value copy: restoring from it never aliases the live parameters.
pub type StateDict = BTreeMap<String, Tensor>;

/// A differentiable classifier the training loop can drive.
///
/// `forward` returns log-probabilities of shape `[batch, num_classes]`.
/// Gradients from `backward` accumulate into the parameters until the
/// optimizer zeroes them.
pub trait Model {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor>;
    fn backward(&mut self, grad_output: &Tensor) -> Result<()>;
    fn parameters_mut(&mut self) -> Vec<&mut Param>;
    fn state_dict(&self) -> StateDict;
    /// Copies every tensor of `state` into the live parameters. Fails, leaving
    /// the model untouched, when keys or shapes disagree.
    fn load_state_dict(&mut self, state: &StateDict) -> Result<()>;
    fn train(&mut self);
    fn eval(&mut self);
    fn is_training(&self) -> bool;
    /// Enables or disables gradient recording; returns the previous setting.
    fn set_grad_enabled(&mut self, enabled: bool) -> bool;
}

/// Runs `f` with gradient recording disabled, restoring the previous setting.
pub fn no_grad<M, T, F>(model: &mut M, f: F) -> T
where
    M: Model + ?Sized,
    F: FnOnce(&mut M) -> T,
{
    let previous = model.set_grad_enabled(false);
    let out = f(model);
    model.set_grad_enabled(previous);
    out
}
