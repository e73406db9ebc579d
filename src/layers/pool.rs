use crate::error::{Error, Result};
use crate::layers::layer::{no_cached_forward, Layer, Mode};
use crate::math::tensor::Tensor;

/// Non-overlapping max pooling with a square window.
///
/// Output spatial dims are `floor(H / size)` × `floor(W / size)`; trailing
/// rows/cols that do not fill a window are dropped.
#[derive(Debug)]
pub struct MaxPool2d {
    pub size: usize,
    // (input shape, flat input index of the max for every output cell)
    argmax: Option<(Vec<usize>, Vec<usize>)>,
}

impl MaxPool2d {
    pub fn new(size: usize) -> MaxPool2d {
        MaxPool2d { size, argmax: None }
    }
}

impl Layer for MaxPool2d {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor> {
        input.expect_rank(4, "max-pool")?;
        let (n, c, h, w) = (input.shape[0], input.shape[1], input.shape[2], input.shape[3]);
        let s = self.size;
        let (ho, wo) = (h / s, w / s);
        if ho == 0 || wo == 0 {
            return Err(Error::ShapeMismatch(format!(
                "max-pool window {} does not fit a {}x{} input",
                s, h, w
            )));
        }

        let mut out = Tensor::zeros(&[n, c, ho, wo]);
        let mut picks = Vec::with_capacity(out.numel());
        for plane in 0..n * c {
            let base = plane * h * w;
            for i in 0..ho {
                for j in 0..wo {
                    let mut best_idx = base + (i * s) * w + j * s;
                    for di in 0..s {
                        for dj in 0..s {
                            let idx = base + (i * s + di) * w + j * s + dj;
                            if input.data[idx] > input.data[best_idx] {
                                best_idx = idx;
                            }
                        }
                    }
                    out.data[(plane * ho + i) * wo + j] = input.data[best_idx];
                    picks.push(best_idx);
                }
            }
        }

        self.argmax = if mode.track_grad { Some((input.shape.clone(), picks)) } else { None };
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let (shape, picks) = self.argmax.as_ref().ok_or_else(|| no_cached_forward("max-pool"))?;
        if grad_output.numel() != picks.len() {
            return Err(Error::ShapeMismatch(format!(
                "max-pool gradient {:?} does not match the last forward pass",
                grad_output.shape
            )));
        }
        let mut input_grad = Tensor::zeros(shape);
        for (&idx, &g) in picks.iter().zip(&grad_output.data) {
            input_grad.data[idx] += g;
        }
        Ok(input_grad)
    }
}
