pub mod activation;
pub mod conv;
pub mod dense;
pub mod dropout;
pub mod flatten;
pub mod layer;
pub mod log_softmax;
pub mod param;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use activation::Activation;
pub use conv::Conv2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use layer::{Layer, Mode};
pub use log_softmax::LogSoftmax;
pub use param::Param;
pub use pool::MaxPool2d;
