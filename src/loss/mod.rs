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

pub mod cross_entropy;

/// Interface for classification losses over `[batch, classes]` outputs and
/// one class index per sample.
pub trait Loss: Send + Sync {
    fn forward(&self, output: &Tensor, target: &[usize]) -> Result<Tensor, TrainingError>;

    /// Gradient of the reduced loss with respect to `output`.
    fn backward(&self, output: &Tensor, target: &[usize]) -> Result<Tensor, TrainingError>;

    /// Optional method to get the name of the loss function
    fn name(&self) -> &str {
        "GenericLoss"
    }

    /// Optional method to get the reduction method used by the loss function
    fn reduction(&self) -> Reduction {
        Reduction::Mean
    }
}

/// Enumeration of possible reduction methods for loss functions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reduction {
    None,
    Mean,
    Sum,
}

pub mod utils {
    use super::*;

    /// Checks that `output` is `[batch, classes]` and `target` has one
    /// in-range class per row.
    pub fn validate_classification(output: &Tensor, target: &[usize]) -> Result<(), TrainingError> {
        if output.shape.len() != 2 {
            return Err(TrainingError::InvalidInputs(format!(
                "Prediction tensor must be 2-dimensional (batch_size, num_classes), got {:?}",
                output.shape
            )));
        }

        if output.shape[0] != target.len() {
            return Err(TrainingError::ShapeMismatch(format!(
                "Batch size {} of prediction does not match {} targets",
                output.shape[0],
                target.len()
            )));
        }

        let num_classes = output.shape[1];
        if let Some(&bad) = target.iter().find(|&&t| t >= num_classes) {
            return Err(TrainingError::InvalidInputs(format!(
                "Target class {} is out of range (0, {})",
                bad,
                num_classes.saturating_sub(1)
            )));
        }
        Ok(())
    }

    /// Applies reduction method to per-sample loss values
    pub fn apply_reduction(losses: Vec<f32>, reduction: Reduction) -> Result<Tensor, TrainingError> {
        match reduction {
            Reduction::None => {
                let len = losses.len();
                Tensor::new(losses, vec![len])
            }
            Reduction::Mean => {
                if losses.is_empty() {
                    return Err(TrainingError::InvalidInputs(
                        "Mean reduction over an empty batch".into(),
                    ));
                }
                let mean = losses.iter().sum::<f32>() / losses.len() as f32;
                Tensor::new(vec![mean], vec![1])
            }
            Reduction::Sum => Tensor::new(vec![losses.iter().sum()], vec![1]),
        }
    }

    /// The single value of a reduced loss.
    pub fn scalar(loss: &Tensor) -> Result<f32, TrainingError> {
        match loss.data() {
            [value] => Ok(*value),
            _ => Err(TrainingError::InvalidShape(format!(
                "expected a scalar loss, got shape {:?}",
                loss.shape
            ))),
        }
    }
}
