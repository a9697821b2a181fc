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

use crate::core::{error::TrainingError, random, tensor::Tensor};
use crate::models::sequential::NeuralLayer;
use rand::RngCore;

/// Fully connected layer: `y = x Wᵀ + b` over `[batch, in_features]`.
pub struct Linear {
    in_features: usize,
    out_features: usize,
    pub(crate) weight: Tensor,
    pub(crate) bias: Option<Tensor>,
    input_cache: Option<Tensor>,
}

impl Linear {
    /// Weights are drawn from `N(0, 2 / (in + out))`; the bias starts at zero.
    pub fn new(
        in_features: usize,
        out_features: usize,
        bias: bool,
        rng: &mut dyn RngCore,
    ) -> Result<Self, TrainingError> {
        if in_features == 0 || out_features == 0 {
            return Err(TrainingError::InvalidParameter(format!(
                "Linear needs non-zero features, got {} -> {}",
                in_features, out_features
            )));
        }

        let std = (2.0 / (in_features + out_features) as f32).sqrt();
        let weight = Tensor::parameter(
            random::normal(rng, 0.0, std, in_features * out_features)?,
            vec![out_features, in_features],
        )?;
        let bias = if bias {
            Some(Tensor::parameter(vec![0.0; out_features], vec![out_features])?)
        } else {
            None
        };

        Ok(Linear {
            in_features,
            out_features,
            weight,
            bias,
            input_cache: None,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    fn forward_impl(&self, input: &Tensor) -> Result<Tensor, TrainingError> {
        if input.shape.len() != 2 {
            return Err(TrainingError::InvalidShape(format!(
                "Linear expects [batch, features], got {:?}",
                input.shape
            )));
        }

        let batch_size = input.shape[0];
        if input.shape[1] != self.in_features {
            return Err(TrainingError::ShapeMismatch(format!(
                "Linear expects {} input features but got {}",
                self.in_features, input.shape[1]
            )));
        }

        let mut output = vec![0.0; batch_size * self.out_features];

        for b in 0..batch_size {
            let row = &input.data[b * self.in_features..(b + 1) * self.in_features];
            for o in 0..self.out_features {
                let weights = &self.weight.data[o * self.in_features..(o + 1) * self.in_features];
                let mut sum: f32 = row.iter().zip(weights).map(|(x, w)| x * w).sum();
                if let Some(ref bias) = self.bias {
                    sum += bias.data[o];
                }
                output[b * self.out_features + o] = sum;
            }
        }

        Tensor::new(output, vec![batch_size, self.out_features])
    }
}

impl NeuralLayer for Linear {
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError> {
        let output = self.forward_impl(input)?;
        self.input_cache = if grad_enabled {
            Some(input.clone())
        } else {
            None
        };
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, TrainingError> {
        let input = self.input_cache.take().ok_or_else(|| {
            TrainingError::InvalidBackward("Linear: forward with gradients not called".into())
        })?;

        let batch_size = input.shape[0];
        if grad_output.shape != [batch_size, self.out_features] {
            return Err(TrainingError::ShapeMismatch(format!(
                "Linear gradient has shape {:?}, expected [{}, {}]",
                grad_output.shape, batch_size, self.out_features
            )));
        }

        let mut grad_input = vec![0.0; input.data.len()];
        let mut grad_weight = vec![0.0; self.weight.data.len()];
        let mut grad_bias = vec![0.0; self.out_features];

        for b in 0..batch_size {
            for o in 0..self.out_features {
                let grad = grad_output.data[b * self.out_features + o];
                for i in 0..self.in_features {
                    grad_input[b * self.in_features + i] +=
                        grad * self.weight.data[o * self.in_features + i];
                    grad_weight[o * self.in_features + i] +=
                        grad * input.data[b * self.in_features + i];
                }
                grad_bias[o] += grad;
            }
        }

        self.weight.accumulate_grad(&grad_weight)?;
        if let Some(ref mut bias) = self.bias {
            bias.accumulate_grad(&grad_bias)?;
        }

        Tensor::new(grad_input, input.shape)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.weight];
        if let Some(ref bias) = self.bias {
            params.push(bias);
        }
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = vec![&mut self.weight];
        if let Some(ref mut bias) = self.bias {
            params.push(bias);
        }
        params
    }

    fn name(&self) -> &str {
        "Linear"
    }

    fn train(&mut self) {}

    fn eval(&mut self) {}
}
