use crate::error::Result;
use crate::loss::loss_fn::{check_targets, LossFunction};
use crate::math::tensor::Tensor;
use crate::network::model::Model;
use crate::optim::optimizer::Optimizer;

/// Index of the maximum element in a slice. Ties resolve to the first index.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &x)| {
            if x > bv {
                (i, x)
            } else {
                (bi, bv)
            }
        })
        .0
}

/// Number of rows of `output` whose argmax equals the target class.
pub fn correct_count(output: &Tensor, targets: &[usize]) -> Result<usize> {
    check_targets(output, targets)?;
    Ok(targets
        .iter()
        .enumerate()
        .filter(|&(i, &t)| argmax(output.row(i)) == t)
        .count())
}

/// Loss and number of correct predictions for one batch.
///
/// `output` must be the model's most recent forward result for this batch.
/// With an optimizer the gradients are zeroed, the loss gradient is
/// back-propagated through `model` and one update step is applied; without
/// one the parameters are left untouched.
pub fn loss_batch<L, M, O>(
    loss_fn: &L,
    model: &mut M,
    output: &Tensor,
    targets: &[usize],
    optimizer: Option<&mut O>,
) -> Result<(f64, usize)>
where
    L: LossFunction + ?Sized,
    M: Model + ?Sized,
    O: Optimizer + ?Sized,
{
    let loss = loss_fn.loss(output, targets)?;
    let correct = correct_count(output, targets)?;

    if let Some(opt) = optimizer {
        opt.zero_grad(&mut model.parameters_mut());
        let grad = loss_fn.gradient(output, targets)?;
        model.backward(&grad)?;
        opt.step(&mut model.parameters_mut())?;
    }

    Ok((loss, correct))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::loss::nll::NllLoss;
    use crate::network::network::Network;
    use crate::optim::sgd::Sgd;

    fn batch() -> Tensor {
        Tensor::from_vec(&[3, 1, 1, 2], vec![1.0, 0.0, 0.0, 1.0, 0.5, 0.5]).unwrap()
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
    }

    #[test]
    fn counts_correct_rows() {
        let output = Tensor::from_vec(&[3, 2], vec![-0.1, -2.0, -3.0, -0.05, -0.7, -0.7]).unwrap();
        assert_eq!(correct_count(&output, &[0, 1, 1]).unwrap(), 2);
    }

    #[test]
    fn without_optimizer_parameters_do_not_move() {
        let mut net = Network::linear((1, 1, 2), 2, 3);
        let before = net.state_dict();
        let output = net.forward(&batch()).unwrap();
        let (loss, correct) =
            loss_batch(&NllLoss, &mut net, &output, &[0, 1, 0], None::<&mut Sgd>).unwrap();
        assert!(loss > 0.0);
        assert!(correct <= 3);
        assert_eq!(net.state_dict(), before);
    }

    #[test]
    fn with_optimizer_loss_goes_down() {
        let mut net = Network::linear((1, 1, 2), 2, 3);
        let mut sgd = Sgd::new(0.1);
        let targets = [0, 1, 0];
        let output = net.forward(&batch()).unwrap();
        let (first, _) = loss_batch(&NllLoss, &mut net, &output, &targets, Some(&mut sgd)).unwrap();
        assert_ne!(net.state_dict(), Network::linear((1, 1, 2), 2, 3).state_dict());
        let output = net.forward(&batch()).unwrap();
        let (second, _) =
            loss_batch(&NllLoss, &mut net, &output, &targets, None::<&mut Sgd>).unwrap();
        assert!(second < first);
    }

    #[test]
    fn mismatched_targets_are_fatal() {
        let output = Tensor::zeros(&[2, 2]);
        let mut net = Network::linear((1, 1, 2), 2, 0);
        let err = loss_batch(&NllLoss, &mut net, &output, &[0], None::<&mut Sgd>).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
        let err = loss_batch(&NllLoss, &mut net, &output, &[0, 2], None::<&mut Sgd>).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }
}
