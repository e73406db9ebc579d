pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod device;
pub mod data;
pub mod train;
pub mod config;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::tensor::Tensor;
pub use activation::activation::ActivationFunction;
pub use network::{no_grad, Model, Network, NetworkParams, StateDict};
pub use loss::nll::NllLoss;
pub use optim::{Adam, Optimizer, ReduceLrOnPlateau, Scheduler, Sgd};
pub use device::Device;
pub use data::{BatchLoader, Dataset, LabeledImageDataset, ResizeToTensor};
pub use train::{loss_batch, run_epoch, train_val, Checkpoint, TrainConfig, TrainingHistory};
pub use config::RunConfig;
