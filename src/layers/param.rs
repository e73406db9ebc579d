use crate::math::tensor::Tensor;

/// A trainable tensor together with its accumulated gradient.
///
/// Gradients accumulate across `backward` calls until `zero_grad` is called,
/// so the optimizer clears them before each batch.
#[derive(Debug, Clone)]
pub struct Param {
    pub value: Tensor,
    pub grad: Tensor,
}

impl Param {
    pub fn new(value: Tensor) -> Param {
        let grad = Tensor::zeros(&value.shape);
        Param { value, grad }
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    pub fn accumulate(&mut self, grad: Tensor) {
        self.grad = std::mem::take(&mut self.grad) + grad;
    }
}
