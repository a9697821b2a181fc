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
use crate::models::sequential::NeuralLayer;

/// Collapses every dimension after the batch dimension: `[B, ...] -> [B, N]`.
pub struct Flatten {
    input_shape: Option<Vec<usize>>,
}

impl Flatten {
    pub fn new() -> Self {
        Flatten { input_shape: None }
    }
}

impl Default for Flatten {
    fn default() -> Self {
        Self::new()
    }
}

impl NeuralLayer for Flatten {
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError> {
        let batch_size = *input.shape.first().ok_or_else(|| {
            TrainingError::InvalidShape("Flatten needs a batch dimension".into())
        })?;
        let features = input.shape[1..].iter().product();

        self.input_shape = if grad_enabled {
            Some(input.shape.clone())
        } else {
            None
        };
        input.reshape(vec![batch_size, features])
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, TrainingError> {
        let shape = self.input_shape.take().ok_or_else(|| {
            TrainingError::InvalidBackward("Flatten: forward with gradients not called".into())
        })?;
        grad_output.reshape(shape)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "Flatten"
    }

    fn train(&mut self) {}

    fn eval(&mut self) {}
}
