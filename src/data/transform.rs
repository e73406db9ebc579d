//! Image preprocessing for the classifier.
//!
//! A transform turns a decoded image into the `(3, H, W)` tensor the network
//! consumes.
use image::{imageops::FilterType, DynamicImage};

use crate::error::Result;
use crate::math::tensor::Tensor;

pub trait Transform {
    fn apply(&self, image: &DynamicImage) -> Result<Tensor>;
}

impl<F> Transform for F
where
    F: Fn(&DynamicImage) -> Result<Tensor>,
{
    fn apply(&self, image: &DynamicImage) -> Result<Tensor> {
        self(image)
    }
}

/// Resizes to `width × height` and lays the pixels out channel-first
/// (R plane, G plane, B plane), normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeToTensor {
    pub width: u32,
    pub height: u32,
}

impl ResizeToTensor {
    pub fn new(width: u32, height: u32) -> ResizeToTensor {
        ResizeToTensor { width, height }
    }

    /// Square resize, e.g. `ResizeToTensor::square(46)`.
    pub fn square(size: u32) -> ResizeToTensor {
        ResizeToTensor::new(size, size)
    }
}

impl Transform for ResizeToTensor {
    fn apply(&self, image: &DynamicImage) -> Result<Tensor> {
        let resized = image.resize_exact(self.width, self.height, FilterType::Triangle);
        let rgb = resized.to_rgb8();
        let (w, h) = (self.width as usize, self.height as usize);
        let mut data = vec![0.0; 3 * w * h];
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = y as usize * w + x as usize;
            for c in 0..3 {
                data[c * w * h + offset] = pixel.0[c] as f64 / 255.0;
            }
        }
        Tensor::from_vec(&[3, h, w], data)
    }
}
