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

/// Batch normalization over `[batch, features]`.
///
/// Training mode normalizes with the batch statistics and folds them into
/// the running estimates as `running = (1 - momentum) * running + momentum
/// * batch` (unbiased variance). Eval mode uses the running estimates and
/// leaves them untouched.
pub struct BatchNorm1d {
    num_features: usize,
    eps: f32,
    momentum: f32,
    pub(crate) running_mean: Vec<f32>,
    pub(crate) running_var: Vec<f32>,
    pub(crate) weight: Tensor,
    pub(crate) bias: Tensor,
    pub(crate) training: bool,
    cache: Option<ForwardCache>,
}

/// Normalized input and per-feature inverse standard deviation used in the
/// forward pass.
struct ForwardCache {
    xhat: Vec<f32>,
    inv_std: Vec<f32>,
    batch_size: usize,
    used_batch_stats: bool,
}

impl BatchNorm1d {
    pub const DEFAULT_EPS: f32 = 1e-5;
    pub const DEFAULT_MOMENTUM: f32 = 0.1;

    pub fn new(num_features: usize, eps: f32, momentum: f32) -> Result<Self, TrainingError> {
        if num_features == 0 {
            return Err(TrainingError::InvalidParameter(
                "BatchNorm1d needs at least one feature".into(),
            ));
        }
        if !(0.0..=1.0).contains(&momentum) || !(eps > 0.0) {
            return Err(TrainingError::InvalidParameter(format!(
                "BatchNorm1d momentum {} / eps {} out of range",
                momentum, eps
            )));
        }

        Ok(BatchNorm1d {
            num_features,
            eps,
            momentum,
            running_mean: vec![0.0; num_features],
            running_var: vec![1.0; num_features],
            weight: Tensor::parameter(vec![1.0; num_features], vec![num_features])?,
            bias: Tensor::parameter(vec![0.0; num_features], vec![num_features])?,
            training: true,
            cache: None,
        })
    }

    pub fn with_defaults(num_features: usize) -> Result<Self, TrainingError> {
        Self::new(num_features, Self::DEFAULT_EPS, Self::DEFAULT_MOMENTUM)
    }

    pub fn running_mean(&self) -> &[f32] {
        &self.running_mean
    }

    pub fn running_var(&self) -> &[f32] {
        &self.running_var
    }

    fn batch_statistics(&self, input: &Tensor) -> (Vec<f32>, Vec<f32>) {
        let (batch_size, features) = (input.shape[0], input.shape[1]);
        let n = batch_size as f32;
        let mut mean = vec![0.0; features];
        let mut var = vec![0.0; features];

        for row in input.data.chunks(features) {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        for row in input.data.chunks(features) {
            for f in 0..features {
                let d = row[f] - mean[f];
                var[f] += d * d / n;
            }
        }
        (mean, var)
    }

    fn update_running_stats(&mut self, mean: &[f32], var: &[f32], batch_size: usize) {
        let correction = if batch_size > 1 {
            batch_size as f32 / (batch_size - 1) as f32
        } else {
            1.0
        };

        for f in 0..self.num_features {
            self.running_mean[f] =
                (1.0 - self.momentum) * self.running_mean[f] + self.momentum * mean[f];
            self.running_var[f] =
                (1.0 - self.momentum) * self.running_var[f] + self.momentum * var[f] * correction;
        }
    }

    fn forward_impl(&mut self, input: &Tensor) -> Result<(Tensor, ForwardCache), TrainingError> {
        if input.shape.len() != 2 || input.shape[0] == 0 {
            return Err(TrainingError::InvalidShape(format!(
                "BatchNorm1d expects a non-empty [batch, features] tensor, got {:?}",
                input.shape
            )));
        }

        let (batch_size, features) = (input.shape[0], input.shape[1]);
        if features != self.num_features {
            return Err(TrainingError::ShapeMismatch(format!(
                "BatchNorm1d expects {} features but got {}",
                self.num_features, features
            )));
        }

        let (mean, inv_std) = if self.training {
            let (mean, var) = self.batch_statistics(input);
            self.update_running_stats(&mean, &var, batch_size);
            let inv_std: Vec<f32> = var
                .iter()
                .map(|v| 1.0 / (v + self.eps).sqrt())
                .collect();
            (mean, inv_std)
        } else {
            let inv_std = self
                .running_var
                .iter()
                .map(|v| 1.0 / (v + self.eps).sqrt())
                .collect();
            (self.running_mean.clone(), inv_std)
        };

        let mut xhat = input.data.clone();
        let mut output = vec![0.0; input.data.len()];
        for (b, row) in xhat.chunks_mut(features).enumerate() {
            for f in 0..features {
                row[f] = (row[f] - mean[f]) * inv_std[f];
                output[b * features + f] = row[f] * self.weight.data[f] + self.bias.data[f];
            }
        }

        let cache = ForwardCache {
            xhat,
            inv_std,
            batch_size,
            used_batch_stats: self.training,
        };
        Ok((Tensor::new(output, input.shape.clone())?, cache))
    }
}

impl NeuralLayer for BatchNorm1d {
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError> {
        let (output, cache) = self.forward_impl(input)?;
        self.cache = if grad_enabled { Some(cache) } else { None };
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, TrainingError> {
        let cache = self.cache.take().ok_or_else(|| {
            TrainingError::InvalidBackward("BatchNorm1d: forward with gradients not called".into())
        })?;
        if grad_output.data.len() != cache.xhat.len() {
            return Err(TrainingError::ShapeMismatch(format!(
                "BatchNorm1d gradient has shape {:?}",
                grad_output.shape
            )));
        }

        let features = self.num_features;
        let n = cache.batch_size as f32;
        let mut dweight = vec![0.0; features];
        let mut dbias = vec![0.0; features];
        let mut sum_dxhat = vec![0.0; features];
        let mut sum_dxhat_xhat = vec![0.0; features];

        for (b, grad_row) in grad_output.data.chunks(features).enumerate() {
            for f in 0..features {
                let xhat = cache.xhat[b * features + f];
                let dxhat = grad_row[f] * self.weight.data[f];
                dweight[f] += grad_row[f] * xhat;
                dbias[f] += grad_row[f];
                sum_dxhat[f] += dxhat;
                sum_dxhat_xhat[f] += dxhat * xhat;
            }
        }

        let mut dx = vec![0.0; grad_output.data.len()];
        for (b, grad_row) in grad_output.data.chunks(features).enumerate() {
            for f in 0..features {
                let idx = b * features + f;
                let dxhat = grad_row[f] * self.weight.data[f];
                dx[idx] = if cache.used_batch_stats {
                    cache.inv_std[f]
                        * (dxhat - sum_dxhat[f] / n - cache.xhat[idx] * sum_dxhat_xhat[f] / n)
                } else {
                    cache.inv_std[f] * dxhat
                };
            }
        }

        self.weight.accumulate_grad(&dweight)?;
        self.bias.accumulate_grad(&dbias)?;

        Tensor::new(dx, grad_output.shape.clone())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn name(&self) -> &str {
        "BatchNorm1d"
    }

    fn train(&mut self) {
        self.training = true;
    }

    fn eval(&mut self) {
        self.training = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn training_normalizes_and_updates_running_stats() {
        let mut bn = BatchNorm1d::with_defaults(1).unwrap();
        let input = Tensor::new(vec![1.0, 3.0], vec![2, 1]).unwrap();
        let out = bn.forward(&input, true).unwrap();

        assert!(approx(out.data()[0], -1.0) && approx(out.data()[1], 1.0));
        // mean 2, unbiased var 2
        assert!(approx(bn.running_mean()[0], 0.2));
        assert!(approx(bn.running_var()[0], 0.9 + 0.2));
    }

    #[test]
    fn eval_uses_and_keeps_running_stats() {
        let mut bn = BatchNorm1d::with_defaults(2).unwrap();
        bn.eval();
        let input = Tensor::new(vec![4.0, -4.0], vec![1, 2]).unwrap();
        let out = bn.forward(&input, false).unwrap();
        assert!(approx(out.data()[0], 4.0) && approx(out.data()[1], -4.0));
        assert_eq!(bn.running_mean(), &[0.0, 0.0]);
        assert_eq!(bn.running_var(), &[1.0, 1.0]);
    }

    #[test]
    fn backward_gradients_sum_to_zero_over_batch() {
        let mut bn = BatchNorm1d::with_defaults(1).unwrap();
        let input = Tensor::new(vec![0.5, 1.5, 4.0], vec![3, 1]).unwrap();
        bn.forward(&input, true).unwrap();
        let dx = bn
            .backward(&Tensor::new(vec![1.0, -2.0, 0.5], vec![3, 1]).unwrap())
            .unwrap();

        let sum: f32 = dx.data().iter().sum();
        assert!(sum.abs() < 1e-4);
        assert_eq!(bn.bias.grad.as_deref(), Some(&[-0.5][..]));
    }

    #[test]
    fn backward_without_cache_fails() {
        let mut bn = BatchNorm1d::with_defaults(1).unwrap();
        bn.forward(&Tensor::ones(&[2, 1]), false).unwrap();
        assert!(bn.backward(&Tensor::ones(&[2, 1])).is_err());
    }
}
