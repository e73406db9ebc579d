use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::data::dataset::Dataset;
use crate::data::loader::BatchLoader;
use crate::error::Result;
use crate::loss::loss_fn::LossFunction;
use crate::network::model::{no_grad, Model};
use crate::optim::optimizer::Optimizer;
use crate::optim::scheduler::Scheduler;
use crate::train::checkpoint::{Checkpoint, CheckpointMetadata};
use crate::train::epoch::run_epoch;
use crate::train::epoch_stats::EpochReport;
use crate::train::history::TrainingHistory;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `model` for `config.epochs` epochs, validating after each one.
///
/// Every epoch that lowers the best validation loss copies the weights into
/// an in-memory snapshot and overwrites the checkpoint at
/// `config.weight_path`. When the scheduler changes the learning rate the
/// snapshot is loaded back into the model before the next epoch. The
/// snapshot is loaded once more when the loop ends, so the model returned to
/// the caller always holds the best weights seen.
///
/// # Early termination
/// The loop stops after the current epoch if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
///
/// # Errors
/// Any dataset, model or IO error aborts the run; the epoch in progress is
/// not recorded and the last written checkpoint is left as is.
pub fn train_val<M, L, O, S, DT, DV>(
    model: &mut M,
    loss_fn: &L,
    optimizer: &mut O,
    scheduler: &mut S,
    train_dl: &mut BatchLoader<DT>,
    val_dl: &mut BatchLoader<DV>,
    config: &TrainConfig,
) -> Result<TrainingHistory>
where
    M: Model + ?Sized,
    L: LossFunction + ?Sized,
    O: Optimizer + ?Sized,
    S: Scheduler,
    DT: Dataset,
    DV: Dataset,
{
    let mut history = TrainingHistory::default();
    let mut best_weights = model.state_dict();
    let mut best_loss = f64::INFINITY;

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            break;
        }

        let t_start = Instant::now();
        let current_lr = optimizer.learning_rate();

        // ── Train ─────────────────────────────────────────────────────────
        model.train();
        let train = run_epoch(
            model,
            loss_fn,
            train_dl,
            Some(&mut *optimizer),
            config.device,
            config.check,
        )?;

        // ── Validate ──────────────────────────────────────────────────────
        model.eval();
        let val = no_grad(model, |m| {
            run_epoch(m, loss_fn, val_dl, None::<&mut O>, config.device, config.check)
        })?;

        // ── Checkpoint ────────────────────────────────────────────────────
        let improved = val.loss < best_loss;
        if improved {
            best_loss = val.loss;
            best_weights = model.state_dict();
            Checkpoint {
                metadata: CheckpointMetadata {
                    epoch,
                    val_loss: val.loss,
                    learning_rate: current_lr,
                },
                weights: best_weights.clone(),
            }
            .save(&config.weight_path)?;
            log::info!("copied best model weights to {}", config.weight_path.display());
        }

        // ── Learning rate ─────────────────────────────────────────────────
        scheduler.step(val.loss, optimizer);
        let rolled_back = optimizer.learning_rate() != current_lr;
        if rolled_back {
            log::warn!("learning rate changed, loading best model weights");
            model.load_state_dict(&best_weights)?;
        }

        let report = EpochReport {
            epoch,
            total_epochs: config.epochs,
            learning_rate: current_lr,
            train,
            val,
            best_val_loss: best_loss,
            improved,
            rolled_back,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        log::info!(
            "epoch {}/{}, lr={:.3e}: train loss {:.6}, val loss {:.6}, accuracy {:.2}%",
            epoch,
            config.epochs,
            current_lr,
            train.loss,
            val.loss,
            100.0 * val.accuracy
        );
        history.record(report.clone());

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(report).is_err() {
                break;
            }
        }
    }

    model.load_state_dict(&best_weights)?;
    Ok(history)
}

fn stop_requested(config: &TrainConfig) -> bool {
    config
        .stop_flag
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Arc};

    use crate::data::dataset::Sample;
    use crate::layers::param::Param;
    use crate::loss::nll::NllLoss;
    use crate::math::tensor::Tensor;
    use crate::network::model::StateDict;
    use crate::network::network::Network;
    use crate::optim::adam::Adam;
    use crate::optim::scheduler::{PlateauConfig, ReduceLrOnPlateau};
    use crate::optim::sgd::Sgd;
    use tempfile::TempDir;

    /// Wraps a network and records the weights seen at every mode switch.
    struct Spy {
        net: Network,
        at_train: Vec<StateDict>,
        at_eval: Vec<StateDict>,
    }

    impl Model for Spy {
        fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
            self.net.forward(input)
        }
        fn backward(&mut self, grad_output: &Tensor) -> Result<()> {
            self.net.backward(grad_output)
        }
        fn parameters_mut(&mut self) -> Vec<&mut Param> {
            self.net.parameters_mut()
        }
        fn state_dict(&self) -> StateDict {
            self.net.state_dict()
        }
        fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
            self.net.load_state_dict(state)
        }
        fn train(&mut self) {
            self.at_train.push(self.net.state_dict());
            self.net.train();
        }
        fn eval(&mut self) {
            self.at_eval.push(self.net.state_dict());
            self.net.eval();
        }
        fn is_training(&self) -> bool {
            self.net.is_training()
        }
        fn set_grad_enabled(&mut self, enabled: bool) -> bool {
            self.net.set_grad_enabled(enabled)
        }
    }

    fn noisy(n: usize, seed: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let a = (((i + seed) * 37) % 11) as f64 / 11.0 - 0.5;
                let b = (((i + seed) * 17) % 7) as f64 / 7.0 - 0.5;
                Sample {
                    image: Tensor::from_vec(&[1, 1, 2], vec![a, b]).unwrap(),
                    label: (i * 5 + seed) % 3 % 2,
                }
            })
            .collect()
    }

    fn config(tmp: &TempDir, epochs: usize) -> TrainConfig {
        TrainConfig {
            epochs,
            batch_size: 4,
            weight_path: tmp.path().join("weights.json"),
            ..TrainConfig::default()
        }
    }

    fn loaders() -> (BatchLoader<Vec<Sample>>, BatchLoader<Vec<Sample>>) {
        (
            BatchLoader::new(noisy(24, 0), 4, true, 1).unwrap(),
            BatchLoader::new(noisy(8, 3), 4, false, 0).unwrap(),
        )
    }

    #[test]
    fn history_has_one_entry_per_epoch() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp, 4);
        let (mut train_dl, mut val_dl) = loaders();
        let mut net = Network::linear((1, 1, 2), 2, 0);
        let mut opt = Adam::new(0.05);
        let mut sched = ReduceLrOnPlateau::new(cfg.plateau_config());
        let history = train_val(
            &mut net,
            &NllLoss,
            &mut opt,
            &mut sched,
            &mut train_dl,
            &mut val_dl,
            &cfg,
        )
        .unwrap();

        assert_eq!(history.len(), 4);
        assert_eq!(history.loss.train.len(), 4);
        assert_eq!(history.metric.val.len(), 4);
        for pair in history.epochs.windows(2) {
            assert!(pair[1].best_val_loss <= pair[0].best_val_loss);
        }
        assert!(history.epochs[0].improved);

        let saved = Checkpoint::load(&cfg.weight_path).unwrap();
        assert_eq!(Some(saved.metadata.val_loss), history.best_val_loss());
    }

    #[test]
    fn rollback_restores_the_best_snapshot() {
        let tmp = TempDir::new().unwrap();
        // Demanding a 99% relative improvement with no patience makes almost
        // every epoch a plateau, so the learning rate keeps changing.
        let cfg = TrainConfig {
            lr_patience: 0,
            lr_threshold: 0.99,
            ..config(&tmp, 6)
        };
        let (mut train_dl, mut val_dl) = loaders();
        let mut spy = Spy {
            net: Network::linear((1, 1, 2), 2, 4),
            at_train: vec![],
            at_eval: vec![],
        };
        let mut opt = Sgd::new(0.2);
        let mut sched = ReduceLrOnPlateau::new(cfg.plateau_config());
        let history = train_val(
            &mut spy,
            &NllLoss,
            &mut opt,
            &mut sched,
            &mut train_dl,
            &mut val_dl,
            &cfg,
        )
        .unwrap();

        assert!(history.epochs.iter().any(|r| r.rolled_back));
        let mut best: Option<(f64, usize)> = None;
        for (k, report) in history.epochs.iter().enumerate() {
            if report.improved {
                best = Some((report.val.loss, k));
            }
            let (_, best_k) = best.unwrap();
            if report.rolled_back && k + 1 < history.len() {
                assert_eq!(spy.at_train[k + 1], spy.at_eval[best_k]);
            }
        }
        let (_, best_k) = best.unwrap();
        assert_eq!(spy.state_dict(), spy.at_eval[best_k]);
    }

    #[test]
    fn never_improving_run_keeps_initial_weights() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp, 2);
        let (mut train_dl, mut val_dl) = loaders();
        let mut net = Network::linear((1, 1, 2), 2, 0);
        let initial = net.state_dict();
        // A NaN validation loss never compares below the best.
        struct Poisoned;
        impl LossFunction for Poisoned {
            fn loss(&self, _: &Tensor, _: &[usize]) -> Result<f64> {
                Ok(f64::NAN)
            }
            fn gradient(&self, output: &Tensor, targets: &[usize]) -> Result<Tensor> {
                NllLoss.gradient(output, targets)
            }
        }
        let mut opt = Sgd::new(0.1);
        let mut sched = ReduceLrOnPlateau::new(PlateauConfig::default());
        let history = train_val(
            &mut net,
            &Poisoned,
            &mut opt,
            &mut sched,
            &mut train_dl,
            &mut val_dl,
            &cfg,
        )
        .unwrap();
        assert!(history.epochs.iter().all(|r| !r.improved));
        assert_eq!(net.state_dict(), initial);
        assert!(!cfg.weight_path.exists());
    }

    #[test]
    fn failed_checkpoint_write_aborts_training() {
        let tmp = TempDir::new().unwrap();
        // The checkpoint directory is a regular file, so the first save fails.
        std::fs::write(tmp.path().join("blocker"), b"").unwrap();
        let cfg = TrainConfig {
            weight_path: tmp.path().join("blocker").join("weights.json"),
            ..config(&tmp, 3)
        };
        let (mut train_dl, mut val_dl) = loaders();
        let mut net = Network::linear((1, 1, 2), 2, 0);
        let mut opt = Adam::new(0.05);
        let mut sched = ReduceLrOnPlateau::new(cfg.plateau_config());
        let result = train_val(
            &mut net,
            &NllLoss,
            &mut opt,
            &mut sched,
            &mut train_dl,
            &mut val_dl,
            &cfg,
        );
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }

    #[test]
    fn stop_flag_and_progress_channel() {
        let tmp = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let flag = Arc::new(AtomicBool::new(false));
        let cfg = TrainConfig {
            progress_tx: Some(tx),
            stop_flag: Some(Arc::clone(&flag)),
            ..config(&tmp, 3)
        };
        let (mut train_dl, mut val_dl) = loaders();
        let mut net = Network::linear((1, 1, 2), 2, 0);
        let mut opt = Adam::new(0.01);
        let mut sched = ReduceLrOnPlateau::new(cfg.plateau_config());
        let history = train_val(
            &mut net,
            &NllLoss,
            &mut opt,
            &mut sched,
            &mut train_dl,
            &mut val_dl,
            &cfg,
        )
        .unwrap();
        let received: Vec<EpochReport> = rx.try_iter().collect();
        assert_eq!(received, history.epochs);

        flag.store(true, Ordering::Relaxed);
        let history = train_val(
            &mut net,
            &NllLoss,
            &mut opt,
            &mut sched,
            &mut train_dl,
            &mut val_dl,
            &cfg,
        )
        .unwrap();
        assert!(history.is_empty());
    }
}
