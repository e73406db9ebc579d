pub mod model;
pub mod network;
pub mod params;

pub use model::{no_grad, Model, StateDict};
pub use network::Network;
pub use params::{conv_output_shape, NetworkParams};
