use crate::error::Result;
use crate::loss::loss_fn::{check_targets, LossFunction};
use crate::math::tensor::Tensor;

/// Negative log-likelihood over log-probabilities, summed over the batch:
///   L = -Σ_i output[i, target_i]
///
/// Pair with a log-softmax output layer; together they form categorical
/// cross-entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NllLoss;

impl LossFunction for NllLoss {
    fn loss(&self, output: &Tensor, targets: &[usize]) -> Result<f64> {
        check_targets(output, targets)?;
        Ok(targets.iter().enumerate()
            .map(|(i, &t)| -output.row(i)[t])
            .sum())
    }

    /// -1 at each sample's target class, 0 elsewhere.
    fn gradient(&self, output: &Tensor, targets: &[usize]) -> Result<Tensor> {
        check_targets(output, targets)?;
        let classes = output.shape[1];
        let mut grad = Tensor::zeros(&output.shape);
        for (i, &t) in targets.iter().enumerate() {
            grad.data[i * classes + t] = -1.0;
        }
        Ok(grad)
    }
}
