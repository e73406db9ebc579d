#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationFunction {
    ReLU,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
        }
    }

    /// Element-wise derivative, evaluated at the pre-activation value.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
        }
    }
}
