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

/// Average pooling of `[batch, channels, height, width]` down to a fixed
/// `output_size` grid, whatever the input resolution.
///
/// Output cell `i` along an axis of length `n` averages input rows
/// `floor(i * n / out) .. ceil((i + 1) * n / out)`.
pub struct AdaptiveAvgPool2d {
    output_size: (usize, usize),
    input_shape: Option<Vec<usize>>,
}

fn bin(index: usize, input: usize, output: usize) -> (usize, usize) {
    let start = index * input / output;
    let end = ((index + 1) * input + output - 1) / output;
    (start, end)
}

impl AdaptiveAvgPool2d {
    pub fn new(output_size: (usize, usize)) -> Result<Self, TrainingError> {
        if output_size.0 == 0 || output_size.1 == 0 {
            return Err(TrainingError::InvalidParameter(
                "AdaptiveAvgPool2d output size must be non-zero".into(),
            ));
        }

        Ok(AdaptiveAvgPool2d {
            output_size,
            input_shape: None,
        })
    }

    pub fn output_size(&self) -> (usize, usize) {
        self.output_size
    }

    fn forward_impl(&self, input: &Tensor) -> Result<Tensor, TrainingError> {
        if input.shape.len() != 4 {
            return Err(TrainingError::InvalidShape(format!(
                "Expected 4D tensor (batch_size, channels, height, width), got {:?}",
                input.shape
            )));
        }

        let (batch_size, channels, height, width) = (
            input.shape[0],
            input.shape[1],
            input.shape[2],
            input.shape[3],
        );
        if height == 0 || width == 0 {
            return Err(TrainingError::InvalidShape(
                "AdaptiveAvgPool2d input has an empty spatial axis".into(),
            ));
        }

        let (out_h, out_w) = self.output_size;
        let mut output = vec![0.0; batch_size * channels * out_h * out_w];

        for (plane_idx, plane) in input.data.chunks(height * width).enumerate() {
            for oh in 0..out_h {
                let (h0, h1) = bin(oh, height, out_h);
                for ow in 0..out_w {
                    let (w0, w1) = bin(ow, width, out_w);
                    let mut sum = 0.0;
                    for h in h0..h1 {
                        sum += plane[h * width + w0..h * width + w1].iter().sum::<f32>();
                    }
                    let count = ((h1 - h0) * (w1 - w0)) as f32;
                    output[(plane_idx * out_h + oh) * out_w + ow] = sum / count;
                }
            }
        }

        Tensor::new(output, vec![batch_size, channels, out_h, out_w])
    }

    fn backward_input(
        &self,
        grad_output: &Tensor,
        input_shape: &[usize],
    ) -> Result<Tensor, TrainingError> {
        let (batch_size, channels, height, width) = (
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3],
        );
        let (out_h, out_w) = self.output_size;
        if grad_output.shape != [batch_size, channels, out_h, out_w] {
            return Err(TrainingError::ShapeMismatch(format!(
                "AdaptiveAvgPool2d gradient has shape {:?}",
                grad_output.shape
            )));
        }

        let mut grad_input = vec![0.0; batch_size * channels * height * width];

        for (plane_idx, grad_plane) in grad_output.data.chunks(out_h * out_w).enumerate() {
            let base = plane_idx * height * width;
            for oh in 0..out_h {
                let (h0, h1) = bin(oh, height, out_h);
                for ow in 0..out_w {
                    let (w0, w1) = bin(ow, width, out_w);
                    let share = grad_plane[oh * out_w + ow] / ((h1 - h0) * (w1 - w0)) as f32;
                    for h in h0..h1 {
                        for g in &mut grad_input[base + h * width + w0..base + h * width + w1] {
                            *g += share;
                        }
                    }
                }
            }
        }

        Tensor::new(grad_input, input_shape.to_vec())
    }
}

impl NeuralLayer for AdaptiveAvgPool2d {
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError> {
        let output = self.forward_impl(input)?;
        self.input_shape = if grad_enabled {
            Some(input.shape.clone())
        } else {
            None
        };
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, TrainingError> {
        let input_shape = self.input_shape.take().ok_or_else(|| {
            TrainingError::InvalidBackward(
                "AdaptiveAvgPool2d: forward with gradients not called".into(),
            )
        })?;
        self.backward_input(grad_output, &input_shape)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "AdaptiveAvgPool2d"
    }

    fn train(&mut self) {}

    fn eval(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_to_fixed_grid() {
        let mut pool = AdaptiveAvgPool2d::new((2, 2)).unwrap();
        let input = Tensor::new((0..16).map(|v| v as f32).collect(), vec![1, 1, 4, 4]).unwrap();
        let out = pool.forward(&input, false).unwrap();
        assert_eq!(out.shape(), &[1, 1, 2, 2]);
        assert_eq!(out.data(), &[2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn eval_mode_pools_the_same() {
        let mut pool = AdaptiveAvgPool2d::new((2, 2)).unwrap();
        let input = Tensor::new((0..16).map(|v| v as f32).collect(), vec![1, 1, 4, 4]).unwrap();
        pool.eval();
        let eval_out = pool.forward(&input, false).unwrap();
        pool.train();
        assert_eq!(eval_out, pool.forward(&input, false).unwrap());
    }

    #[test]
    fn uneven_bins_overlap() {
        assert_eq!(bin(0, 5, 2), (0, 3));
        assert_eq!(bin(1, 5, 2), (2, 5));
        let mut pool = AdaptiveAvgPool2d::new((3, 3)).unwrap();
        let out = pool.forward(&Tensor::ones(&[2, 3, 7, 5]), false).unwrap();
        assert_eq!(out.shape(), &[2, 3, 3, 3]);
        assert!(out.data().iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn backward_spreads_gradient_evenly() {
        let mut pool = AdaptiveAvgPool2d::new((1, 1)).unwrap();
        pool.forward(&Tensor::zeros(&[1, 1, 2, 2]), true).unwrap();
        let grad = pool
            .backward(&Tensor::new(vec![4.0], vec![1, 1, 1, 1]).unwrap())
            .unwrap();
        assert_eq!(grad.data(), &[1.0, 1.0, 1.0, 1.0]);
    }
}
