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

use crate::core::error::TrainingError;

/// Dense row-major `f32` tensor with an optional gradient buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    pub requires_grad: bool,
    pub grad: Option<Vec<f32>>,
}

impl Tensor {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self, TrainingError> {
        let size: usize = shape.iter().product();
        if data.len() != size {
            return Err(TrainingError::InvalidShape(format!(
                "{} values cannot fill shape {:?} ({} elements)",
                data.len(),
                shape,
                size
            )));
        }

        Ok(Tensor {
            data,
            shape,
            requires_grad: false,
            grad: None,
        })
    }

    /// Marks the tensor as a trainable parameter with a zeroed gradient.
    pub fn parameter(data: Vec<f32>, shape: Vec<usize>) -> Result<Self, TrainingError> {
        let mut tensor = Tensor::new(data, shape)?;
        tensor.requires_grad = true;
        tensor.grad = Some(vec![0.0; tensor.data.len()]);
        Ok(tensor)
    }

    pub fn zeros(shape: &[usize]) -> Self {
        let size = shape.iter().product();
        Tensor {
            data: vec![0.0; size],
            shape: shape.to_vec(),
            requires_grad: false,
            grad: None,
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        let size = shape.iter().product();
        Tensor {
            data: vec![1.0; size],
            shape: shape.to_vec(),
            requires_grad: false,
            grad: None,
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Same data viewed under a new shape with the same element count.
    pub fn reshape(&self, shape: Vec<usize>) -> Result<Tensor, TrainingError> {
        Tensor::new(self.data.clone(), shape)
    }

    /// Adds `delta` into the gradient buffer, allocating it on first use.
    pub fn accumulate_grad(&mut self, delta: &[f32]) -> Result<(), TrainingError> {
        if delta.len() != self.data.len() {
            return Err(TrainingError::ShapeMismatch(format!(
                "gradient of {} values for tensor of shape {:?}",
                delta.len(),
                self.shape
            )));
        }

        let grad = self.grad.get_or_insert_with(|| vec![0.0; delta.len()]);
        for (g, d) in grad.iter_mut().zip(delta) {
            *g += d;
        }
        Ok(())
    }

    pub fn zero_grad(&mut self) {
        if let Some(grad) = &mut self.grad {
            grad.iter_mut().for_each(|g| *g = 0.0);
        }
    }

    /// Stacks equally shaped tensors along a new leading batch dimension.
    pub fn stack(tensors: &[Tensor]) -> Result<Tensor, TrainingError> {
        let first = tensors
            .first()
            .ok_or_else(|| TrainingError::InvalidInputs("cannot stack an empty batch".into()))?;
        let base_shape = first.shape();

        for (i, tensor) in tensors.iter().enumerate().skip(1) {
            if tensor.shape() != base_shape {
                return Err(TrainingError::ShapeMismatch(format!(
                    "tensor 0 has shape {:?} but tensor {} has shape {:?}",
                    base_shape,
                    i,
                    tensor.shape()
                )));
            }
        }

        let mut new_shape = vec![tensors.len()];
        new_shape.extend(base_shape);

        let mut data = Vec::with_capacity(first.numel() * tensors.len());
        for tensor in tensors {
            data.extend_from_slice(&tensor.data);
        }

        Tensor::new(data, new_shape)
    }

    /// Index of the largest value in every row of a `[rows, cols]` tensor.
    pub fn argmax_rows(&self) -> Result<Vec<usize>, TrainingError> {
        if self.shape.len() != 2 || self.shape[1] == 0 {
            return Err(TrainingError::InvalidShape(format!(
                "argmax expects a non-empty 2D tensor, got {:?}",
                self.shape
            )));
        }

        Ok(self
            .data
            .chunks(self.shape[1])
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                        if v > best.1 {
                            (i, v)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_shape() {
        assert!(Tensor::new(vec![1.0, 2.0, 3.0], vec![2, 2]).is_err());
        assert_eq!(Tensor::new(vec![0.0; 6], vec![2, 3]).unwrap().numel(), 6);
    }

    #[test]
    fn stack_adds_batch_dimension() {
        let a = Tensor::new(vec![1.0, 2.0], vec![2]).unwrap();
        let b = Tensor::new(vec![3.0, 4.0], vec![2]).unwrap();
        let stacked = Tensor::stack(&[a, b]).unwrap();
        assert_eq!(stacked.shape(), &[2, 2]);
        assert_eq!(stacked.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn stack_rejects_mixed_shapes() {
        let a = Tensor::zeros(&[2]);
        let b = Tensor::zeros(&[3]);
        assert!(matches!(
            Tensor::stack(&[a, b]),
            Err(TrainingError::ShapeMismatch(_))
        ));
        assert!(Tensor::stack(&[]).is_err());
    }

    #[test]
    fn argmax_picks_first_maximum_per_row() {
        let t = Tensor::new(vec![0.1, 0.9, 2.0, 2.0, -1.0, -3.0], vec![3, 2]).unwrap();
        assert_eq!(t.argmax_rows().unwrap(), vec![1, 0, 0]);
    }

    #[test]
    fn gradients_accumulate_and_reset() {
        let mut p = Tensor::parameter(vec![0.0; 2], vec![2]).unwrap();
        p.accumulate_grad(&[1.0, 2.0]).unwrap();
        p.accumulate_grad(&[1.0, 2.0]).unwrap();
        assert_eq!(p.grad.as_deref(), Some(&[2.0, 4.0][..]));
        p.zero_grad();
        assert_eq!(p.grad.as_deref(), Some(&[0.0, 0.0][..]));
        assert!(p.accumulate_grad(&[1.0]).is_err());
    }
}
