use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::ops::{Add, Sub};

use crate::error::{Error, Result};

/// Dense row-major tensor of `f64` values.
///
/// Images are stored as `[channels, height, width]`, batches as
/// `[batch, channels, height, width]` and layer outputs as `[batch, features]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            shape: shape.to_vec(),
            data: vec![0.0; shape.iter().product()],
        }
    }

    pub fn from_vec(shape: &[usize], data: Vec<f64>) -> Result<Tensor> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch(format!(
                "shape {:?} needs {} values, got {}",
                shape, expected, data.len()
            )));
        }
        Ok(Tensor { shape: shape.to_vec(), data })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Draw two independent uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(shape: &[usize], std_dev: f64, rng: &mut R) -> Tensor {
        let mut res = Tensor::zeros(shape);
        for x in res.data.iter_mut() {
            *x = Tensor::sample_standard_normal(rng) * std_dev;
        }
        res
    }

    /// He initialization: samples from N(0, sqrt(2 / fan_in)).
    ///
    /// Used before ReLU layers. The variance 2/fan_in accounts for the fact
    /// that ReLU zeroes half of its inputs on average.
    pub fn he<R: Rng + ?Sized>(shape: &[usize], fan_in: usize, rng: &mut R) -> Tensor {
        Tensor::normal(shape, (2.0 / fan_in as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / fan_in)).
    ///
    /// Used for the layer feeding the log-softmax output.
    pub fn xavier<R: Rng + ?Sized>(shape: &[usize], fan_in: usize, rng: &mut R) -> Tensor {
        Tensor::normal(shape, (1.0 / fan_in as f64).sqrt(), rng)
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Size of dimension `dim`, or an error if the tensor has fewer dims.
    pub fn dim(&self, dim: usize) -> Result<usize> {
        self.shape.get(dim).copied().ok_or_else(|| {
            Error::ShapeMismatch(format!("tensor of shape {:?} has no dim {}", self.shape, dim))
        })
    }

    /// Fails unless the tensor has exactly `rank` dimensions.
    pub fn expect_rank(&self, rank: usize, what: &str) -> Result<()> {
        if self.shape.len() != rank {
            return Err(Error::ShapeMismatch(format!(
                "{} expects a rank-{} tensor, got shape {:?}",
                what, rank, self.shape
            )));
        }
        Ok(())
    }

    /// Same data, new shape. The element count must not change.
    pub fn reshape(self, shape: &[usize]) -> Result<Tensor> {
        Tensor::from_vec(shape, self.data)
    }

    /// Row `i` of a rank-2 tensor.
    pub fn row(&self, i: usize) -> &[f64] {
        let cols = self.shape[1];
        &self.data[i * cols..(i + 1) * cols]
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Stacks equally-shaped tensors along a new leading dimension.
    pub fn stack(items: &[Tensor]) -> Result<Tensor> {
        let first = items.first().ok_or_else(|| {
            Error::ShapeMismatch("cannot stack an empty list of tensors".into())
        })?;
        let mut data = Vec::with_capacity(first.numel() * items.len());
        for item in items {
            if item.shape != first.shape {
                return Err(Error::ShapeMismatch(format!(
                    "cannot stack {:?} with {:?}",
                    item.shape, first.shape
                )));
            }
            data.extend_from_slice(&item.data);
        }
        let mut shape = Vec::with_capacity(first.shape.len() + 1);
        shape.push(items.len());
        shape.extend_from_slice(&first.shape);
        Ok(Tensor { shape, data })
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor { shape: vec![0], data: vec![] }
    }
}

/// Element-wise sum. Operands must share a shape; this is an internal
/// invariant of the layers and is only checked in debug builds.
impl Add for Tensor {
    type Output = Tensor;

    fn add(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.shape, rhs.shape, "Tensors are of incorrect sizes");
        let data = self.data.iter().zip(rhs.data.iter()).map(|(a, b)| a + b).collect();
        Tensor { shape: self.shape, data }
    }
}

impl Sub for Tensor {
    type Output = Tensor;

    fn sub(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.shape, rhs.shape, "Tensors are of incorrect sizes");
        let data = self.data.iter().zip(rhs.data.iter()).map(|(a, b)| a - b).collect();
        Tensor { shape: self.shape, data }
    }
}
