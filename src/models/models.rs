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
use crate::models::sequential::Sequential;
use serde::{Deserialize, Serialize};

/// Base model trait: what the trainer drives during an epoch.
pub trait Model: Send {
    /// Forward pass through the model
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError>;

    /// Backward pass through the model
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, TrainingError>;

    fn parameters(&self) -> Vec<&Tensor>;

    /// Trainable parameters, handed to the optimizer.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Set model to training mode
    fn train(&mut self);

    /// Set model to evaluation mode
    fn eval(&mut self);

    fn is_training(&self) -> bool;

    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}

/// Model configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelConfig {
    pub num_classes: usize,
    /// Side of the pooled feature grid produced by the frozen backbone.
    pub pool_size: usize,
    pub dropout_rate: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            num_classes: 2,
            pool_size: 4,
            dropout_rate: 0.5,
        }
    }
}

impl Model for Sequential {
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError> {
        if self.layers.is_empty() {
            return Err(TrainingError::InvalidInputs("Model has no layers".into()));
        }

        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current, grad_enabled)?;
        }
        Ok(current)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, TrainingError> {
        if self.layers.is_empty() {
            return Err(TrainingError::InvalidInputs("Model has no layers".into()));
        }

        let mut current_grad = grad.clone();
        for layer in self.layers.iter_mut().rev() {
            current_grad = layer.backward(&current_grad)?;
        }
        Ok(current_grad)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.layers
            .iter()
            .flat_map(|layer| layer.parameters())
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect()
    }

    fn train(&mut self) {
        self.training = true;
        for layer in &mut self.layers {
            layer.train();
        }
    }

    fn eval(&mut self) {
        self.training = false;
        for layer in &mut self.layers {
            layer.eval();
        }
    }

    fn is_training(&self) -> bool {
        self.training
    }
}
