use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// A classification loss over `[batch, classes]` model output and one class
/// index per sample.
pub trait LossFunction {
    /// Scalar loss, summed (not averaged) over the batch.
    fn loss(&self, output: &Tensor, targets: &[usize]) -> Result<f64>;

    /// dL/d(output), same shape as `output`.
    fn gradient(&self, output: &Tensor, targets: &[usize]) -> Result<Tensor>;
}

/// Checks that `output` is `[targets.len(), C]` and every target is `< C`.
pub fn check_targets(output: &Tensor, targets: &[usize]) -> Result<()> {
    output.expect_rank(2, "loss")?;
    let (n, classes) = (output.shape[0], output.shape[1]);
    if n != targets.len() {
        return Err(Error::ShapeMismatch(format!(
            "output has {} rows but {} targets were given",
            n, targets.len()
        )));
    }
    if let Some(bad) = targets.iter().find(|&&t| t >= classes) {
        return Err(Error::ShapeMismatch(format!(
            "target class {} is out of range for {} output classes",
            bad, classes
        )));
    }
    Ok(())
}
