// Copyright (C) 2024 Bellande Artificial Intelligence Computer Vision Research Innovation Center, Ronaldson Bellande

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::core::{error::TrainingError, tensor::Tensor};

/// Trait defining a neural network layer
pub trait NeuralLayer: Send + Sync {
    /// Forward pass. With `grad_enabled` false the layer keeps nothing for
    /// backward, so a following `backward` call fails.
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError>;

    /// Backward pass; accumulates parameter gradients and returns the
    /// gradient with respect to the layer input.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, TrainingError>;

    fn parameters(&self) -> Vec<&Tensor>;

    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    fn name(&self) -> &str;

    /// Set layer to training mode
    fn train(&mut self);

    /// Set layer to evaluation mode
    fn eval(&mut self);
}

/// Sequential container for neural network layers
pub struct Sequential {
    pub(crate) layers: Vec<Box<dyn NeuralLayer>>,
    pub(crate) training: bool,
}

impl Sequential {
    /// Creates a new empty Sequential container
    pub fn new() -> Self {
        Sequential {
            layers: Vec::new(),
            training: true,
        }
    }

    /// Adds a layer to the container and returns mutable reference for chaining
    pub fn add(&mut self, layer: Box<dyn NeuralLayer>) -> &mut Self {
        self.layers.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{flatten::Flatten, linear::Linear};
    use crate::models::models::Model;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_net() -> Sequential {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = Sequential::new();
        net.add(Box::new(Flatten::new()))
            .add(Box::new(Linear::new(4, 2, true, &mut rng).unwrap()));
        net
    }

    #[test]
    fn forward_runs_layers_in_order() {
        let mut net = small_net();
        assert_eq!(net.layer_names(), vec!["Flatten", "Linear"]);
        let out = net
            .forward(&Tensor::ones(&[3, 1, 2, 2]), true)
            .unwrap();
        assert_eq!(out.shape(), &[3, 2]);
    }

    #[test]
    fn backward_requires_grad_enabled_forward() {
        let mut net = small_net();
        net.forward(&Tensor::ones(&[1, 4]), false).unwrap();
        assert!(matches!(
            net.backward(&Tensor::ones(&[1, 2])),
            Err(TrainingError::InvalidBackward(_))
        ));

        net.forward(&Tensor::ones(&[1, 4]), true).unwrap();
        let grad_input = net.backward(&Tensor::ones(&[1, 2])).unwrap();
        assert_eq!(grad_input.shape(), &[1, 4]);
        assert!(net.parameters().iter().all(|p| p.grad.is_some()));
    }

    #[test]
    fn empty_container_is_rejected() {
        let mut net = Sequential::new();
        assert!(net.is_empty());
        assert!(matches!(
            net.forward(&Tensor::ones(&[1, 1]), false),
            Err(TrainingError::InvalidInputs(_))
        ));
    }

    #[test]
    fn mode_switch_reaches_every_layer() {
        let mut net = small_net();
        net.eval();
        assert!(!net.is_training());
        net.train();
        assert!(net.is_training());
    }
}
