use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Shape options for the convolutional classifier.
///
/// Fields:
/// - `shape_in`        — `(channels, height, width)` of each input image
/// - `initial_filters` — filters of the first conv block; each later block doubles it
/// - `num_fc1`         — width of the hidden fully connected layer
/// - `dropout_rate`    — dropout probability applied after `fc1`
/// - `num_classes`     — output classes (2 for real / fake)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    pub shape_in: (usize, usize, usize),
    pub initial_filters: usize,
    pub num_fc1: usize,
    pub dropout_rate: f64,
    pub num_classes: usize,
}

impl Default for NetworkParams {
    fn default() -> Self {
        NetworkParams {
            shape_in: (3, 46, 46),
            initial_filters: 8,
            num_fc1: 100,
            dropout_rate: 0.25,
            num_classes: 2,
        }
    }
}

impl NetworkParams {
    pub fn validate(&self) -> Result<()> {
        let (c, h, w) = self.shape_in;
        if c == 0 || h == 0 || w == 0 {
            return Err(Error::Config(format!("shape_in {:?} has a zero dimension", self.shape_in)));
        }
        if self.initial_filters == 0 || self.num_fc1 == 0 {
            return Err(Error::Config("initial_filters and num_fc1 must be > 0".into()));
        }
        if self.num_classes < 2 {
            return Err(Error::Config(format!(
                "num_classes must be >= 2, got {}",
                self.num_classes
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(Error::Config(format!(
                "dropout_rate {} must be in [0, 1)",
                self.dropout_rate
            )));
        }
        Ok(())
    }
}

/// Spatial size after a stride-1, unpadded `kernel`×`kernel` convolution
/// followed by a `pool`×`pool` max-pool (`pool == 0` means no pooling).
pub fn conv_output_shape(
    h_in: usize,
    w_in: usize,
    kernel: usize,
    pool: usize,
) -> Result<(usize, usize)> {
    if h_in < kernel || w_in < kernel {
        return Err(Error::Config(format!(
            "a {}x{} input is smaller than the {}x{} kernel",
            h_in, w_in, kernel, kernel
        )));
    }
    let mut h_out = h_in - kernel + 1;
    let mut w_out = w_in - kernel + 1;
    if pool > 0 {
        h_out /= pool;
        w_out /= pool;
    }
    if h_out == 0 || w_out == 0 {
        return Err(Error::Config(format!(
            "a {}x{} input collapses to zero after conv({}) + pool({})",
            h_in, w_in, kernel, pool
        )));
    }
    Ok((h_out, w_out))
}
