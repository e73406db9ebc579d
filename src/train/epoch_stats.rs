use serde::{Serialize, Deserialize};

/// Loss and accuracy of one pass over a loader.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EpochStats {
    /// Summed batch loss divided by the dataset length.
    pub loss: f64,
    /// Correct predictions divided by the dataset length, in [0, 1].
    pub accuracy: f64,
}

/// Per-epoch record emitted by `train_val`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the training
/// loop sends one `EpochReport` at the end of every completed epoch; the same
/// records are kept in the returned `TrainingHistory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Learning rate used for this epoch's training pass.
    pub learning_rate: f64,
    pub train: EpochStats,
    pub val: EpochStats,
    /// Best validation loss seen so far, including this epoch.
    pub best_val_loss: f64,
    /// This epoch set a new best and was checkpointed.
    pub improved: bool,
    /// The scheduler changed the learning rate and the best weights were reloaded.
    pub rolled_back: bool,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
