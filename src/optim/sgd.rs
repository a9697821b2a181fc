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
use crate::optim::{utils::grad_norm, Optimizer, OptimizerState};
use log::debug;

/// Stochastic gradient descent with optional momentum and weight decay.
///
/// With momentum `m` each step computes `v = m * v + g` and `p -= lr * v`
/// (or `p -= lr * (g + m * v)` with Nesterov).
pub struct SGD {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    nesterov: bool,
    velocity: Vec<Vec<f32>>,
    state: OptimizerState,
}

impl SGD {
    pub fn new(lr: f32, momentum: f32) -> Result<Self, TrainingError> {
        Self::with_options(lr, momentum, 0.0, false)
    }

    pub fn with_options(
        lr: f32,
        momentum: f32,
        weight_decay: f32,
        nesterov: bool,
    ) -> Result<Self, TrainingError> {
        if !(lr > 0.0) {
            return Err(TrainingError::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                lr
            )));
        }
        if !(0.0..=1.0).contains(&momentum) || weight_decay < 0.0 {
            return Err(TrainingError::InvalidParameter(format!(
                "momentum {} must be in [0, 1] and weight decay {} non-negative",
                momentum, weight_decay
            )));
        }
        if nesterov && momentum == 0.0 {
            return Err(TrainingError::InvalidParameter(
                "Nesterov momentum requires a momentum above zero".into(),
            ));
        }

        Ok(SGD {
            lr,
            momentum,
            weight_decay,
            nesterov,
            velocity: Vec::new(),
            state: OptimizerState::new(),
        })
    }

    fn check_velocity(&mut self, params: &[&mut Tensor]) -> Result<(), TrainingError> {
        if self.velocity.is_empty() {
            self.velocity = params.iter().map(|p| vec![0.0; p.numel()]).collect();
            return Ok(());
        }

        let matches = self.velocity.len() == params.len()
            && self
                .velocity
                .iter()
                .zip(params.iter())
                .all(|(v, p)| v.len() == p.numel());
        if !matches {
            return Err(TrainingError::ShapeMismatch(
                "SGD received a different parameter set than on its first step".into(),
            ));
        }
        Ok(())
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [&mut Tensor]) -> Result<(), TrainingError> {
        if self.momentum > 0.0 {
            self.check_velocity(params)?;
        }
        let norm = grad_norm(params);

        for (idx, param) in params.iter_mut().enumerate() {
            let param: &mut Tensor = param;
            let Some(grad) = param.grad.as_ref() else {
                continue;
            };

            if self.momentum > 0.0 {
                let v = &mut self.velocity[idx];
                for ((p, g), v_i) in param.data.iter_mut().zip(grad.iter()).zip(v.iter_mut()) {
                    let mut d_p = *g + self.weight_decay * *p;
                    *v_i = self.momentum * *v_i + d_p;
                    if self.nesterov {
                        d_p += self.momentum * *v_i;
                    } else {
                        d_p = *v_i;
                    }
                    *p -= self.lr * d_p;
                }
            } else {
                for (p, g) in param.data.iter_mut().zip(grad.iter()) {
                    let d_p = *g + self.weight_decay * *p;
                    *p -= self.lr * d_p;
                }
            }
        }

        self.state.increment_step();
        debug!("SGD step {} (lr {}, grad norm {:.6})", self.state.step, self.lr, norm);
        Ok(())
    }

    fn zero_grad(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    fn get_lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn name(&self) -> &str {
        "SGD"
    }

    fn state(&self) -> &OptimizerState {
        &self.state
    }
}
