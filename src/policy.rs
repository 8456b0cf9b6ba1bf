//! Multi-hypothesis trajectory policy network using Burn

use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::trajectory::TrajectoryLayout;

/// Configuration for the policy MLP
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Hidden layer size
    pub hidden_size: usize,
    /// Number of hidden layers
    pub num_layers: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            hidden_size: 256,
            num_layers: 2,
        }
    }
}

/// Policy network - maps an observation to a set of candidate trajectories.
///
/// The head emits `set_size * vector_len` values which are reshaped into a
/// trajectory set; the last element of each slot is the raw existence score
/// the loss pushes toward plus or minus one.
#[derive(Module, Debug)]
pub struct TrajectoryPolicy<B: Backend> {
    /// Input layer
    input: Linear<B>,
    /// Hidden layers
    hidden: Vec<Linear<B>>,
    /// Output layer (flattened trajectory set)
    output: Linear<B>,
    /// Activation function
    activation: Relu,
    /// Trajectory slots per observation
    set_size: usize,
    /// Flat length of one trajectory vector
    vector_len: usize,
}

impl<B: Backend> TrajectoryPolicy<B> {
    pub fn new(
        device: &B::Device,
        obs_size: usize,
        layout: &TrajectoryLayout,
        set_size: usize,
        config: &PolicyConfig,
    ) -> Self {
        let input = LinearConfig::new(obs_size, config.hidden_size).init(device);

        let mut hidden = Vec::new();
        for _ in 0..config.num_layers.saturating_sub(1) {
            hidden.push(LinearConfig::new(config.hidden_size, config.hidden_size).init(device));
        }

        let vector_len = layout.vector_len();
        let output = LinearConfig::new(config.hidden_size, set_size * vector_len).init(device);

        Self {
            input,
            hidden,
            output,
            activation: Relu::new(),
            set_size,
            vector_len,
        }
    }

    /// Forward pass: `[batch, obs_size]` to `[batch, set_size, vector_len]`
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch_size, _] = obs.dims();

        let mut x = self.activation.forward(self.input.forward(obs));
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }

        self.output
            .forward(x)
            .reshape([batch_size, self.set_size, self.vector_len])
    }
}
