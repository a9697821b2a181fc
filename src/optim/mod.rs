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

pub mod sgd;

/// Parameter update rule. The model owns its parameters; the optimizer
/// receives them on every call and keeps only its own state (such as
/// momentum buffers), indexed by parameter position.
pub trait Optimizer: Send {
    fn step(&mut self, params: &mut [&mut Tensor]) -> Result<(), TrainingError>;
    fn zero_grad(&mut self, params: &mut [&mut Tensor]);
    fn get_lr(&self) -> f32;
    fn set_lr(&mut self, lr: f32);
    fn name(&self) -> &str {
        "GenericOptimizer"
    }
    fn state(&self) -> &OptimizerState;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct OptimizerState {
    pub step: usize,
}

impl OptimizerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_step(&mut self) {
        self.step += 1;
    }
}

pub mod utils {
    use super::*;

    /// L2 norm over the gradients of `parameters`.
    pub fn grad_norm(parameters: &[&mut Tensor]) -> f32 {
        parameters
            .iter()
            .filter_map(|p| p.grad.as_ref())
            .flat_map(|g| g.iter())
            .map(|g| g * g)
            .sum::<f32>()
            .sqrt()
    }
}
