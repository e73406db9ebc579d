//! JSON run configuration for the `train` command.
//!
//! ```json
//! {
//!   "model": { "shape_in": [3, 46, 46], "initial_filters": 8, "num_fc1": 100,
//!              "dropout_rate": 0.25, "num_classes": 2 },
//!   "train": { "epochs": 30, "batch_size": 32, "learning_rate": 0.0003 },
//!   "data":  { "split": "train", "image_size": 46 }
//! }
//! ```
//!
//! Every section and key is optional; missing values take their defaults.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::network::params::NetworkParams;
use crate::train::checkpoint::write_json;
use crate::train::train_config::TrainConfig;

/// Where the images come from and how they are resized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Sub-directory of the data directory holding the images.
    pub split: String,
    /// Images are resized to `image_size × image_size`.
    pub image_size: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig { split: "train".to_string(), image_size: 46 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: NetworkParams,
    pub train: TrainConfig,
    pub data: DataConfig,
}

impl RunConfig {
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(File::create(path)?, self)
    }

    /// Checks each section and that the resized images match the model input.
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.train.validate()?;
        let (channels, h, w) = self.model.shape_in;
        let size = self.data.image_size as usize;
        if channels != 3 || h != size || w != size {
            return Err(Error::Config(format!(
                "model expects input {:?} but images are resized to (3, {}, {})",
                self.model.shape_in, size, size
            )));
        }
        Ok(())
    }
}
