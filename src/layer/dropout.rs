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
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Inverted dropout: zeroes each element with probability `p` in training
/// mode and scales survivors by `1 / (1 - p)`. Identity in eval mode.
pub struct Dropout {
    p: f32,
    rng: StdRng,
    mask: Option<Vec<bool>>,
    pub(crate) training: bool,
}

impl Dropout {
    pub fn new(p: f32, seed: u64) -> Result<Self, TrainingError> {
        if !(0.0..1.0).contains(&p) {
            return Err(TrainingError::InvalidParameter(
                "Dropout probability must be in [0, 1)".into(),
            ));
        }

        Ok(Dropout {
            p,
            rng: StdRng::seed_from_u64(seed),
            mask: None,
            training: true,
        })
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    fn forward_impl(&mut self, input: &Tensor) -> Result<(Tensor, Vec<bool>), TrainingError> {
        if !self.training || self.p == 0.0 {
            return Ok((input.clone(), vec![true; input.data.len()]));
        }

        let mask = random::bernoulli(&mut self.rng, 1.0 - self.p, input.data.len());
        let scale = 1.0 / (1.0 - self.p);
        let output: Vec<f32> = input
            .data
            .iter()
            .zip(mask.iter())
            .map(|(&x, &m)| if m { x * scale } else { 0.0 })
            .collect();

        Ok((Tensor::new(output, input.shape.clone())?, mask))
    }
}

impl NeuralLayer for Dropout {
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError> {
        let (output, mask) = self.forward_impl(input)?;
        self.mask = if grad_enabled { Some(mask) } else { None };
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, TrainingError> {
        let mask = self.mask.take().ok_or_else(|| {
            TrainingError::InvalidBackward("Dropout: forward with gradients not called".into())
        })?;
        if mask.len() != grad_output.data.len() {
            return Err(TrainingError::ShapeMismatch(format!(
                "Dropout gradient of {} values for mask of {}",
                grad_output.data.len(),
                mask.len()
            )));
        }

        let scale = if self.training { 1.0 / (1.0 - self.p) } else { 1.0 };
        let grad: Vec<f32> = grad_output
            .data
            .iter()
            .zip(mask.iter())
            .map(|(&g, &m)| if m { g * scale } else { 0.0 })
            .collect();

        Tensor::new(grad, grad_output.shape.clone())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "Dropout"
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

    #[test]
    fn eval_mode_is_identity() {
        let mut dropout = Dropout::new(0.5, 1).unwrap();
        dropout.eval();
        let input = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        assert_eq!(dropout.forward(&input, false).unwrap().data(), input.data());
    }

    #[test]
    fn training_mode_zeroes_or_scales() {
        let mut dropout = Dropout::new(0.5, 42).unwrap();
        let input = Tensor::ones(&[4, 64]);
        let out = dropout.forward(&input, true).unwrap();
        assert!(out.data().iter().all(|&v| v == 0.0 || v == 2.0));
        assert!(out.data().iter().any(|&v| v == 0.0));

        let grad = dropout.backward(&Tensor::ones(&[4, 64])).unwrap();
        assert_eq!(grad.data(), out.data());
    }

    #[test]
    fn same_seed_same_mask() {
        let input = Tensor::ones(&[1, 32]);
        let a = Dropout::new(0.3, 9).unwrap().forward(&input, false).unwrap();
        let b = Dropout::new(0.3, 9).unwrap().forward(&input, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_probability() {
        assert!(Dropout::new(1.0, 0).is_err());
        assert!(Dropout::new(-0.1, 0).is_err());
    }
}
