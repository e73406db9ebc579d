use rand::{rngs::StdRng, SeedableRng};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::{
    Activation, Conv2d, Dense, Dropout, Flatten, Layer, LogSoftmax, MaxPool2d, Mode, Param,
};
use crate::math::tensor::Tensor;
use crate::network::model::{Model, StateDict};
use crate::network::params::{conv_output_shape, NetworkParams};

const KERNEL: usize = 3;
const POOL: usize = 2;
const CONV_BLOCKS: usize = 4;

/// A chain of named layers; parameter keys are `"<layer name>.<param name>"`.
pub struct Network {
    layers: Vec<(String, Box<dyn Layer>)>,
    training: bool,
    grad_enabled: bool,
}

impl Network {
    /// Empty network in training mode with gradient recording on.
    pub fn new() -> Network {
        Network { layers: Vec::new(), training: true, grad_enabled: true }
    }

    pub fn push<L: Layer + 'static>(mut self, name: &str, layer: L) -> Network {
        self.layers.push((name.to_string(), Box::new(layer)));
        self
    }

    /// The real/fake CNN: four (conv 3x3 → ReLU → max-pool 2x2) blocks with
    /// `f, 2f, 4f, 8f` filters, then `fc1 → ReLU → dropout → fc2 → log-softmax`.
    pub fn conv_net(params: &NetworkParams, seed: u64) -> Result<Network> {
        params.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut channels, mut h, mut w) = params.shape_in;
        let mut net = Network::new();

        for block in 1..=CONV_BLOCKS {
            let filters = params.initial_filters << (block - 1);
            (h, w) = conv_output_shape(h, w, KERNEL, POOL)?;
            net = net
                .push(&format!("conv{}", block), Conv2d::new(channels, filters, KERNEL, &mut rng))
                .push(&format!("relu{}", block), Activation::new(ActivationFunction::ReLU))
                .push(&format!("pool{}", block), MaxPool2d::new(POOL));
            channels = filters;
        }

        let flat = channels * h * w;
        Ok(net
            .push("flatten", Flatten::new())
            .push("fc1", Dense::he(flat, params.num_fc1, &mut rng))
            .push("relu_fc1", Activation::new(ActivationFunction::ReLU))
            .push("dropout", Dropout::new(params.dropout_rate, seed.wrapping_add(1))?)
            .push("fc2", Dense::xavier(params.num_fc1, params.num_classes, &mut rng))
            .push("log_softmax", LogSoftmax::new()))
    }

    /// Minimal linear classifier: `flatten → dense → log-softmax`.
    pub fn linear(shape_in: (usize, usize, usize), num_classes: usize, seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        let features = shape_in.0 * shape_in.1 * shape_in.2;
        Network::new()
            .push("flatten", Flatten::new())
            .push("fc", Dense::xavier(features, num_classes, &mut rng))
            .push("log_softmax", LogSoftmax::new())
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn mode(&self) -> Mode {
        Mode { training: self.training, track_grad: self.grad_enabled }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::new()
    }
}

impl Model for Network {
    /// Forward pass; when gradients are enabled each layer caches what its
    /// backward pass needs.
    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let mode = self.mode();
        let mut current = input.clone();
        for (_, layer) in &mut self.layers {
            current = layer.forward(&current, mode)?;
        }
        Ok(current)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<()> {
        let mut delta = grad_output.clone();
        for (_, layer) in self.layers.iter_mut().rev() {
            delta = layer.backward(&delta)?;
        }
        Ok(())
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        self.layers
            .iter_mut()
            .flat_map(|(_, layer)| layer.params_mut().into_iter().map(|(_, p)| p))
            .collect()
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (name, layer) in &self.layers {
            for (param_name, p) in layer.params() {
                state.insert(format!("{}.{}", name, param_name), p.value.clone());
            }
        }
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        // Validate everything first so a bad snapshot leaves the model intact.
        let mut expected = 0;
        for (name, layer) in &self.layers {
            for (param_name, p) in layer.params() {
                let key = format!("{}.{}", name, param_name);
                let value = state.get(&key).ok_or_else(|| {
                    Error::Model(format!("state dict is missing '{}'", key))
                })?;
                if value.shape != p.value.shape {
                    return Err(Error::ShapeMismatch(format!(
                        "'{}' has shape {:?} in the state dict but {:?} in the model",
                        key, value.shape, p.value.shape
                    )));
                }
                expected += 1;
            }
        }
        if expected != state.len() {
            return Err(Error::Model(format!(
                "state dict has {} entries, model has {} parameters",
                state.len(), expected
            )));
        }

        for (name, layer) in &mut self.layers {
            for (param_name, p) in layer.params_mut() {
                let key = format!("{}.{}", name, param_name);
                if let Some(value) = state.get(&key) {
                    p.value.data.copy_from_slice(&value.data);
                }
            }
        }
        Ok(())
    }

    fn train(&mut self) {
        self.training = true;
    }

    fn eval(&mut self) {
        self.training = false;
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_grad_enabled(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.grad_enabled, enabled)
    }
}
