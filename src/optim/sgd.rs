use crate::error::Result;
use crate::layers::param::Param;
use crate::optim::optimizer::Optimizer;

#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Plain gradient descent: `w ← w - lr · ∇w`.
    fn step(&mut self, params: &mut [&mut Param]) -> Result<()> {
        let lr = self.learning_rate;
        for p in params.iter_mut() {
            p.value = std::mem::take(&mut p.value) - p.grad.map(|g| g * lr);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
