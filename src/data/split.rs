use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::{Dataset, Sample};
use crate::error::{Error, Result};

/// A view of `dataset` restricted to `indices`, in that order.
pub struct Subset<D: Dataset> {
    dataset: Arc<D>,
    indices: Vec<usize>,
}

impl<D: Dataset> Subset<D> {
    pub fn new(dataset: Arc<D>, indices: Vec<usize>) -> Subset<D> {
        Subset { dataset, indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl<D: Dataset> Dataset for Subset<D> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let inner = *self.indices.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.indices.len(),
        })?;
        self.dataset.get(inner)
    }
}

/// Splits `dataset` into disjoint train and validation subsets.
///
/// The train part gets `floor(len * train_fraction)` samples, the
/// validation part the rest; membership is drawn from a permutation seeded
/// by `seed`.
pub fn random_split<D: Dataset>(
    dataset: D,
    train_fraction: f64,
    seed: u64,
) -> Result<(Subset<D>, Subset<D>)> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(Error::Config(format!(
            "train fraction must be in [0, 1], got {}",
            train_fraction
        )));
    }
    let n = dataset.len();
    let train_len = (n as f64 * train_fraction).floor() as usize;

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let val = order.split_off(train_len);

    let dataset = Arc::new(dataset);
    Ok((Subset::new(Arc::clone(&dataset), order), Subset::new(dataset, val)))
}
