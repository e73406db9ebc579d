//! Mini-batch loader over a `Dataset`.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::Dataset;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// Stacked inputs `[N, C, H, W]` with one label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Tensor,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Places the batch on `device`.
    pub fn to_device(self, device: Device) -> Result<Batch> {
        match device {
            Device::Cpu => Ok(self),
        }
    }
}

/// Loads `indices` from `dataset` and stacks them into one batch.
pub fn collate<D: Dataset + ?Sized>(dataset: &D, indices: &[usize]) -> Result<Batch> {
    let mut images = Vec::with_capacity(indices.len());
    let mut labels = Vec::with_capacity(indices.len());
    for &i in indices {
        let sample = dataset.get(i)?;
        images.push(sample.image);
        labels.push(sample.label);
    }
    Ok(Batch { inputs: Tensor::stack(&images)?, labels })
}

pub struct BatchLoader<D: Dataset> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
    indices: Vec<usize>,
    position: usize,
}

impl<D: Dataset> BatchLoader<D> {
    pub fn new(dataset: D, batch_size: usize, shuffle: bool, seed: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".into()));
        }
        let mut loader = BatchLoader {
            indices: (0..dataset.len()).collect(),
            dataset,
            batch_size,
            shuffle,
            rng: StdRng::seed_from_u64(seed),
            position: 0,
        };
        loader.reset();
        Ok(loader)
    }

    /// Starts a new pass, drawing a fresh permutation when shuffling.
    pub fn reset(&mut self) {
        self.position = 0;
        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
    }

    /// Next batch of the current pass, or `None` once every index was served.
    pub fn next_batch(&mut self) -> Result<Option<Batch>> {
        if self.position >= self.indices.len() {
            return Ok(None);
        }
        let end = (self.position + self.batch_size).min(self.indices.len());
        let batch = collate(&self.dataset, &self.indices[self.position..end])?;
        self.position = end;
        Ok(Some(batch))
    }

    /// A full pass over the dataset.
    pub fn iter(&mut self) -> Batches<'_, D> {
        self.reset();
        Batches { loader: self }
    }

    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }
}

pub struct Batches<'a, D: Dataset> {
    loader: &'a mut BatchLoader<D>,
}

impl<D: Dataset> Iterator for Batches<'_, D> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch().transpose()
    }
}
