use std::sync::Arc;

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// One labelled example: a `(3, H, W)` image tensor and its class index.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: Tensor,
    pub label: usize,
}

/// Random-access collection of samples with a fixed length.
pub trait Dataset {
    fn len(&self) -> usize;

    /// Materializes sample `index`. Fails with `IndexOutOfBounds` past the end.
    fn get(&self, index: usize) -> Result<Sample>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (**self).get(index)
    }
}

/// In-memory samples, handy for small or synthetic data.
impl Dataset for Vec<Sample> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        self.as_slice()
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfBounds { index, len: self.as_slice().len() })
    }
}
