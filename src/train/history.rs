use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::train::checkpoint::write_json;
use crate::train::epoch_stats::EpochReport;

/// One value per epoch for each split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitLog {
    pub train: Vec<f64>,
    pub val: Vec<f64>,
}

/// Everything `train_val` recorded, in epoch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: SplitLog,
    /// Accuracy per epoch.
    pub metric: SplitLog,
    pub epochs: Vec<EpochReport>,
}

impl TrainingHistory {
    pub fn record(&mut self, report: EpochReport) {
        self.loss.train.push(report.train.loss);
        self.loss.val.push(report.val.loss);
        self.metric.train.push(report.train.accuracy);
        self.metric.val.push(report.val.accuracy);
        self.epochs.push(report);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Lowest validation loss recorded, if any epoch ran.
    pub fn best_val_loss(&self) -> Option<f64> {
        self.loss.val.iter().copied().reduce(f64::min)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(File::create(path)?, self)
    }
}
