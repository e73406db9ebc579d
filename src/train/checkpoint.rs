//! Best-model checkpoint persisted during training.
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::network::model::StateDict;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// 1-based epoch that produced these weights.
    pub epoch: usize,
    pub val_loss: f64,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub metadata: CheckpointMetadata,
    pub weights: StateDict,
}

impl Checkpoint {
    /// Serializes the checkpoint to a pretty-printed JSON file, replacing any
    /// previous file at `path`.
    ///
    /// The JSON goes to `<path>.tmp` first and is renamed over `path` only
    /// once fully written, so a failed save leaves the previous file intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(path);
        let written = File::create(&tmp)
            .map_err(Into::into)
            .and_then(|file| write_json(file, self));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Deserializes a checkpoint previously written by `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Checkpoint> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Pretty-prints `value` into `writer` and flushes, surfacing write errors
/// that a dropped `BufWriter` would swallow.
pub(crate) fn write_json<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
