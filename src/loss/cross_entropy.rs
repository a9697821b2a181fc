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
use crate::loss::{utils, Loss, Reduction};

/// Softmax cross-entropy between raw logits and class indices.
pub struct CrossEntropyLoss {
    reduction: Reduction,
}

impl CrossEntropyLoss {
    pub fn new(reduction: Reduction) -> Self {
        CrossEntropyLoss { reduction }
    }

    fn compute_log_softmax(&self, input: &Tensor) -> Vec<f32> {
        let num_classes = input.shape[1];
        let mut output = Vec::with_capacity(input.data.len());

        for row in input.data.chunks(num_classes) {
            // Shift by the row max for numerical stability
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let log_sum = row.iter().map(|&x| (x - max).exp()).sum::<f32>().ln();
            output.extend(row.iter().map(|&x| x - max - log_sum));
        }
        output
    }
}

impl Default for CrossEntropyLoss {
    fn default() -> Self {
        CrossEntropyLoss::new(Reduction::Mean)
    }
}

impl Loss for CrossEntropyLoss {
    fn forward(&self, prediction: &Tensor, target: &[usize]) -> Result<Tensor, TrainingError> {
        utils::validate_classification(prediction, target)?;

        let num_classes = prediction.shape[1];
        let log_softmax = self.compute_log_softmax(prediction);
        let losses = target
            .iter()
            .enumerate()
            .map(|(b, &t)| -log_softmax[b * num_classes + t])
            .collect();

        utils::apply_reduction(losses, self.reduction)
    }

    fn backward(&self, prediction: &Tensor, target: &[usize]) -> Result<Tensor, TrainingError> {
        utils::validate_classification(prediction, target)?;

        let (batch_size, num_classes) = (prediction.shape[0], prediction.shape[1]);
        let scale = match self.reduction {
            Reduction::Mean => 1.0 / batch_size as f32,
            Reduction::Sum | Reduction::None => 1.0,
        };

        // softmax - one_hot
        let mut grad: Vec<f32> = self
            .compute_log_softmax(prediction)
            .into_iter()
            .map(f32::exp)
            .collect();
        for (b, &t) in target.iter().enumerate() {
            grad[b * num_classes + t] -= 1.0;
        }
        grad.iter_mut().for_each(|g| *g *= scale);

        Tensor::new(grad, prediction.shape.clone())
    }

    fn name(&self) -> &str {
        "CrossEntropyLoss"
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn uniform_logits_give_log_num_classes() {
        let loss = CrossEntropyLoss::default();
        let logits = Tensor::zeros(&[3, 2]);
        let value = utils::scalar(&loss.forward(&logits, &[0, 1, 1]).unwrap()).unwrap();
        assert!(approx(value, 2f32.ln()));
    }

    #[test]
    fn confident_correct_prediction_is_cheap() {
        let loss = CrossEntropyLoss::default();
        let logits = Tensor::new(vec![10.0, -10.0], vec![1, 2]).unwrap();
        let good = utils::scalar(&loss.forward(&logits, &[0]).unwrap()).unwrap();
        let bad = utils::scalar(&loss.forward(&logits, &[1]).unwrap()).unwrap();
        assert!(good >= 0.0 && good < 1e-3);
        assert!(bad > 19.0);
    }

    #[test]
    fn gradient_is_softmax_minus_one_hot_over_batch() {
        let loss = CrossEntropyLoss::default();
        let logits = Tensor::zeros(&[2, 2]);
        let grad = loss.backward(&logits, &[0, 1]).unwrap();
        assert_eq!(grad.data(), &[-0.25, 0.25, 0.25, -0.25]);
    }

    #[test]
    fn unreduced_loss_keeps_per_sample_values() {
        let loss = CrossEntropyLoss::new(Reduction::None);
        let out = loss.forward(&Tensor::zeros(&[4, 2]), &[0, 0, 1, 1]).unwrap();
        assert_eq!(out.shape(), &[4]);
        assert!(utils::scalar(&out).is_err());
    }

    #[test]
    fn rejects_out_of_range_targets() {
        let loss = CrossEntropyLoss::default();
        assert!(matches!(
            loss.forward(&Tensor::zeros(&[1, 2]), &[2]),
            Err(TrainingError::InvalidInputs(_))
        ));
        assert!(matches!(
            loss.forward(&Tensor::zeros(&[2, 2]), &[0]),
            Err(TrainingError::ShapeMismatch(_))
        ));
    }
}
