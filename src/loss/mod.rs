pub mod loss_fn;
pub mod nll;

pub use loss_fn::LossFunction;
pub use nll::NllLoss;
