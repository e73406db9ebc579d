use crate::error::Result;
use crate::layers::param::Param;

/// Updates parameters from their accumulated gradients.
pub trait Optimizer {
    /// Clears previously accumulated gradients.
    fn zero_grad(&mut self, params: &mut [&mut Param]) {
        for p in params.iter_mut() {
            p.zero_grad();
        }
    }

    /// Applies one update step to every parameter.
    fn step(&mut self, params: &mut [&mut Param]) -> Result<()>;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}
