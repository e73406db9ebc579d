use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{Error, Result};
use crate::optim::scheduler::PlateauConfig;
use crate::train::epoch_stats::EpochReport;

/// Configuration for a `train_val` run.
///
/// # Fields
/// - `epochs`              — number of train + validation passes
/// - `batch_size`          — samples per mini-batch
/// - `learning_rate`       — initial optimizer learning rate
/// - `lr_reduction_factor` — multiplier applied by the plateau scheduler
/// - `lr_patience`         — bad epochs tolerated before a reduction
/// - `lr_threshold`        — relative improvement the scheduler requires
/// - `weight_path`         — checkpoint file, overwritten on every new best
/// - `check`               — stop every pass after its first batch
/// - `device`              — placement for both train and validation batches
/// - `seed`                — seeds dataset order, split, loaders and init
/// - `val_split`           — fraction of the labelled images held out
/// - `progress_tx` — optional channel sender; one `EpochReport` is sent per
///                   completed epoch.  If the receiver is dropped the loop
///                   stops after the current epoch.
/// - `stop_flag`   — optional atomic flag; when set to `true` from another
///                   thread the loop stops after the current epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub lr_reduction_factor: f64,
    pub lr_patience: usize,
    pub lr_threshold: f64,
    pub weight_path: PathBuf,
    pub check: bool,
    pub device: Device,
    pub seed: u64,
    pub val_split: f64,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<EpochReport>>,
    #[serde(skip)]
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 30,
            batch_size: 32,
            learning_rate: 3e-4,
            lr_reduction_factor: 0.5,
            lr_patience: 20,
            lr_threshold: 1e-4,
            weight_path: PathBuf::from("weights.json"),
            check: false,
            device: Device::Cpu,
            seed: 0,
            val_split: 0.2,
            progress_tx: None,
            stop_flag: None,
        }
    }
}

impl TrainConfig {
    /// Scheduler settings derived from the `lr_*` fields.
    pub fn plateau_config(&self) -> PlateauConfig {
        PlateauConfig {
            factor: self.lr_reduction_factor,
            patience: self.lr_patience,
            threshold: self.lr_threshold,
            ..PlateauConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.lr_reduction_factor > 0.0 && self.lr_reduction_factor < 1.0) {
            return Err(Error::Config(format!(
                "lr_reduction_factor must be in (0, 1), got {}",
                self.lr_reduction_factor
            )));
        }
        if !(0.0..1.0).contains(&self.val_split) {
            return Err(Error::Config(format!(
                "val_split must be in [0, 1), got {}",
                self.val_split
            )));
        }
        Ok(())
    }
}
