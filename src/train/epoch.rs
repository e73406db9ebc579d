use crate::data::dataset::Dataset;
use crate::data::loader::BatchLoader;
use crate::device::Device;
use crate::error::Result;
use crate::loss::loss_fn::LossFunction;
use crate::network::model::Model;
use crate::optim::optimizer::Optimizer;
use crate::train::epoch_stats::EpochStats;
use crate::train::metrics::loss_batch;

/// One pass over `loader`: forward every batch and accumulate loss and
/// correct predictions, stepping `optimizer` after each batch when given.
///
/// With `check` set the pass stops after the first batch. Loss and accuracy
/// are divided by the full dataset length either way, so an early-stopped
/// pass under-reports both. An empty dataset yields zeros.
///
/// The caller is responsible for putting `model` in train or eval mode.
pub fn run_epoch<M, L, D, O>(
    model: &mut M,
    loss_fn: &L,
    loader: &mut BatchLoader<D>,
    mut optimizer: Option<&mut O>,
    device: Device,
    check: bool,
) -> Result<EpochStats>
where
    M: Model + ?Sized,
    L: LossFunction + ?Sized,
    D: Dataset,
    O: Optimizer + ?Sized,
{
    let len = loader.dataset().len();
    let mut running_loss = 0.0;
    let mut running_correct = 0;

    for (i, batch) in loader.iter().enumerate() {
        let batch = batch?.to_device(device)?;
        let output = model.forward(&batch.inputs)?;
        let (loss, correct) = loss_batch(
            loss_fn,
            model,
            &output,
            &batch.labels,
            optimizer.as_deref_mut(),
        )?;
        log::debug!("batch {}: loss {:.4}, {}/{} correct", i + 1, loss, correct, batch.len());
        running_loss += loss;
        running_correct += correct;

        if check {
            break;
        }
    }

    if len == 0 {
        return Ok(EpochStats::default());
    }
    Ok(EpochStats {
        loss: running_loss / len as f64,
        accuracy: running_correct as f64 / len as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Sample;
    use crate::loss::nll::NllLoss;
    use crate::math::tensor::Tensor;
    use crate::network::network::Network;
    use crate::optim::sgd::Sgd;

    fn two_class(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let label = i % 2;
                let v = if label == 1 { 1.0 } else { -1.0 };
                Sample { image: Tensor::from_vec(&[1, 1, 2], vec![v, -v]).unwrap(), label }
            })
            .collect()
    }

    fn eval_pass(
        net: &mut Network,
        loader: &mut BatchLoader<Vec<Sample>>,
        check: bool,
    ) -> EpochStats {
        run_epoch(net, &NllLoss, loader, None::<&mut Sgd>, Device::Cpu, check).unwrap()
    }

    fn single_loss(net: &mut Network, sample: &Sample) -> f64 {
        let out = net.forward(&Tensor::stack(&[sample.image.clone()]).unwrap()).unwrap();
        NllLoss.loss(&out, &[sample.label]).unwrap()
    }

    #[test]
    fn eval_pass_matches_a_manual_sum() {
        let mut net = Network::linear((1, 1, 2), 2, 1);
        net.eval();
        let data = two_class(10);
        let manual: f64 = data.iter().map(|s| single_loss(&mut net, s)).sum();
        let mut loader = BatchLoader::new(data, 4, false, 0).unwrap();
        let stats = eval_pass(&mut net, &mut loader, false);
        assert!((stats.loss - manual / 10.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&stats.accuracy));
    }

    #[test]
    fn single_sample_with_a_larger_batch_size() {
        let mut net = Network::linear((1, 1, 2), 2, 4);
        net.eval();
        let data = two_class(1);
        let expected = single_loss(&mut net, &data[0]);
        let mut loader = BatchLoader::new(data, 32, true, 0).unwrap();
        let stats = eval_pass(&mut net, &mut loader, false);
        assert!((stats.loss - expected).abs() < 1e-12);
        assert!(stats.accuracy == 0.0 || stats.accuracy == 1.0);

        let mut sgd = Sgd::new(0.1);
        net.train();
        let trained =
            run_epoch(&mut net, &NllLoss, &mut loader, Some(&mut sgd), Device::Cpu, false)
                .unwrap();
        assert!(trained.loss.is_finite());
    }

    #[test]
    fn check_mode_divides_by_full_length() {
        let mut net = Network::linear((1, 1, 2), 2, 1);
        let mut full = BatchLoader::new(two_class(8), 2, false, 0).unwrap();
        let mut first = BatchLoader::new(two_class(2), 2, false, 0).unwrap();
        let whole_first = eval_pass(&mut net, &mut first, false);
        let checked = eval_pass(&mut net, &mut full, true);
        // One batch of two samples, reported over a dataset of eight.
        assert!((checked.loss - whole_first.loss * 2.0 / 8.0).abs() < 1e-9);
        assert!(checked.accuracy <= 0.25);
    }

    #[test]
    fn empty_dataset_reports_zero() {
        let mut net = Network::linear((1, 1, 2), 2, 1);
        let mut loader = BatchLoader::new(Vec::<Sample>::new(), 4, true, 0).unwrap();
        assert_eq!(eval_pass(&mut net, &mut loader, false), EpochStats::default());
    }

    #[test]
    fn training_pass_reduces_loss() {
        let mut net = Network::linear((1, 1, 2), 2, 1);
        let mut sgd = Sgd::new(0.05);
        let mut loader = BatchLoader::new(two_class(16), 4, true, 3).unwrap();
        let mut losses = Vec::new();
        for _ in 0..5 {
            let stats =
                run_epoch(&mut net, &NllLoss, &mut loader, Some(&mut sgd), Device::Cpu, false)
                    .unwrap();
            losses.push(stats.loss);
        }
        assert!(losses[4] < losses[0]);
    }
}
