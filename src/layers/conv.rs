use rand::Rng;

use crate::error::{Error, Result};
use crate::layers::layer::{no_cached_forward, Layer, Mode};
use crate::layers::param::Param;
use crate::math::tensor::Tensor;

/// 2-D convolution with a square kernel, stride 1 and no padding.
///
/// Input `[N, C_in, H, W]` → output `[N, C_out, H - k + 1, W - k + 1]`.
/// Weights are `[C_out, C_in, k, k]`, biases `[C_out]`.
#[derive(Debug)]
pub struct Conv2d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub weights: Param,
    pub biases: Param,
    input: Option<Tensor>,
}

impl Conv2d {
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        rng: &mut R,
    ) -> Conv2d {
        let fan_in = in_channels * kernel * kernel;
        Conv2d {
            in_channels,
            out_channels,
            kernel,
            weights: Param::new(Tensor::he(
                &[out_channels, in_channels, kernel, kernel],
                fan_in,
                rng,
            )),
            biases: Param::new(Tensor::zeros(&[out_channels])),
            input: None,
        }
    }

    fn output_dims(&self, input: &Tensor) -> Result<(usize, usize, usize, usize)> {
        input.expect_rank(4, "conv2d")?;
        let (n, c, h, w) = (input.shape[0], input.shape[1], input.shape[2], input.shape[3]);
        if c != self.in_channels {
            return Err(Error::ShapeMismatch(format!(
                "conv2d expects {} input channels, got {}",
                self.in_channels, c
            )));
        }
        if h < self.kernel || w < self.kernel {
            return Err(Error::ShapeMismatch(format!(
                "conv2d kernel {} does not fit a {}x{} input",
                self.kernel, h, w
            )));
        }
        Ok((n, h, w, self.kernel))
    }
}

impl Layer for Conv2d {
    fn forward(&mut self, input: &Tensor, mode: Mode) -> Result<Tensor> {
        let (n, h, w, k) = self.output_dims(input)?;
        let (ci, co) = (self.in_channels, self.out_channels);
        let (ho, wo) = (h - k + 1, w - k + 1);
        let x = &input.data;
        let wt = &self.weights.value.data;
        let mut out = Tensor::zeros(&[n, co, ho, wo]);

        for b in 0..n {
            for o in 0..co {
                let plane = (b * co + o) * ho * wo;
                let out_plane = &mut out.data[plane..plane + ho * wo];
                out_plane.iter_mut().for_each(|v| *v = self.biases.value.data[o]);
                for c in 0..ci {
                    let in_base = (b * ci + c) * h * w;
                    for ki in 0..k {
                        for kj in 0..k {
                            let wv = wt[((o * ci + c) * k + ki) * k + kj];
                            for i in 0..ho {
                                let in_row = in_base + (i + ki) * w + kj;
                                let out_row = &mut out_plane[i * wo..(i + 1) * wo];
                                for (j, ov) in out_row.iter_mut().enumerate() {
                                    *ov += wv * x[in_row + j];
                                }
                            }
                        }
                    }
                }
            }
        }

        self.input = if mode.track_grad { Some(input.clone()) } else { None };
        Ok(out)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor> {
        let input = self.input.as_ref().ok_or_else(|| no_cached_forward("conv2d"))?;
        let (n, c_in, h, w) = (input.shape[0], input.shape[1], input.shape[2], input.shape[3]);
        let (co, k) = (self.out_channels, self.kernel);
        let (ho, wo) = (h - k + 1, w - k + 1);
        if grad_output.shape != [n, co, ho, wo] {
            return Err(Error::ShapeMismatch(format!(
                "conv2d gradient {:?} does not match output [{}, {}, {}, {}]",
                grad_output.shape, n, co, ho, wo
            )));
        }

        let x = &input.data;
        let g = &grad_output.data;
        let wt = &self.weights.value.data;
        let mut w_grad = Tensor::zeros(&self.weights.value.shape);
        let mut b_grad = Tensor::zeros(&[co]);
        let mut input_grad = Tensor::zeros(&input.shape);

        for b in 0..n {
            for o in 0..co {
                let plane = (b * co + o) * ho * wo;
                let g_plane = &g[plane..plane + ho * wo];
                b_grad.data[o] += g_plane.iter().sum::<f64>();
                for c in 0..c_in {
                    let in_base = (b * c_in + c) * h * w;
                    for ki in 0..k {
                        for kj in 0..k {
                            let w_idx = ((o * c_in + c) * k + ki) * k + kj;
                            let wv = wt[w_idx];
                            let mut acc = 0.0;
                            for i in 0..ho {
                                let in_row = in_base + (i + ki) * w + kj;
                                for j in 0..wo {
                                    let gv = g_plane[i * wo + j];
                                    acc += gv * x[in_row + j];
                                    input_grad.data[in_row + j] += gv * wv;
                                }
                            }
                            w_grad.data[w_idx] += acc;
                        }
                    }
                }
            }
        }

        self.weights.accumulate(w_grad);
        self.biases.accumulate(b_grad);
        Ok(input_grad)
    }

    fn params(&self) -> Vec<(&'static str, &Param)> {
        vec![("weight", &self.weights), ("bias", &self.biases)]
    }

    fn params_mut(&mut self) -> Vec<(&'static str, &mut Param)> {
        vec![("weight", &mut self.weights), ("bias", &mut self.biases)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::testing::{check_input_gradient, check_param_gradient, TRAIN};
    use rand::{rngs::StdRng, SeedableRng};

    fn input() -> Tensor {
        let data = (0..2 * 2 * 4 * 4).map(|i| ((i * 37 % 11) as f64) / 10.0 - 0.5).collect();
        Tensor::from_vec(&[2, 2, 4, 4], data).unwrap()
    }

    #[test]
    fn output_shape_shrinks_by_kernel() {
        let mut conv = Conv2d::new(2, 3, 3, &mut StdRng::seed_from_u64(3));
        let y = conv.forward(&input(), TRAIN).unwrap();
        assert_eq!(y.shape, vec![2, 3, 2, 2]);
    }

    #[test]
    fn single_tap_kernel_copies_input() {
        let mut conv = Conv2d::new(1, 1, 1, &mut StdRng::seed_from_u64(0));
        conv.weights.value.data = vec![2.0];
        conv.biases.value.data = vec![1.0];
        let x = Tensor::from_vec(&[1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let y = conv.forward(&x, TRAIN).unwrap();
        assert_eq!(y.data, vec![3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let mut conv = Conv2d::new(3, 1, 3, &mut StdRng::seed_from_u64(0));
        assert!(matches!(conv.forward(&input(), TRAIN), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut conv = Conv2d::new(2, 3, 3, &mut StdRng::seed_from_u64(5));
        check_input_gradient(&mut conv, &input());
        check_param_gradient(&mut conv, &input());
    }
}
