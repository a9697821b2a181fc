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

use crate::core::{
    error::TrainingError,
    random::{self, Stream},
    tensor::Tensor,
};
use crate::layer::{
    batch_norm::BatchNorm1d, dropout::Dropout, flatten::Flatten, linear::Linear,
    pooling::AdaptiveAvgPool2d,
};
use crate::models::models::{Model, ModelConfig};
use crate::models::sequential::Sequential;
use log::info;
use rand::Rng;

/// Image classifier built as a frozen feature extractor plus a trainable
/// head.
///
/// The backbone (adaptive average pooling to `pool_size × pool_size`,
/// flatten) has no parameters and never receives gradients. The head
/// (`BatchNorm1d → Dropout → Linear(features, num_classes)`) is the only
/// part the optimizer sees.
pub struct TransferClassifier {
    backbone: Sequential,
    head: Sequential,
    config: ModelConfig,
    training: bool,
}

impl TransferClassifier {
    pub const INPUT_CHANNELS: usize = 3;

    pub fn build(config: &ModelConfig, seed: u64) -> Result<Self, TrainingError> {
        if config.num_classes == 0 || config.pool_size == 0 {
            return Err(TrainingError::InvalidConfiguration(format!(
                "classifier needs num_classes > 0 and pool_size > 0, got {:?}",
                config
            )));
        }

        let features = Self::INPUT_CHANNELS * config.pool_size * config.pool_size;

        let mut backbone = Sequential::new();
        backbone
            .add(Box::new(AdaptiveAvgPool2d::new((
                config.pool_size,
                config.pool_size,
            ))?))
            .add(Box::new(Flatten::new()));

        let mut init_rng = random::rng_for(seed, Stream::WeightInit);
        let dropout_seed = random::rng_for(seed, Stream::Dropout).gen::<u64>();

        let mut head = Sequential::new();
        head.add(Box::new(BatchNorm1d::with_defaults(features)?))
            .add(Box::new(Dropout::new(config.dropout_rate, dropout_seed)?))
            .add(Box::new(Linear::new(
                features,
                config.num_classes,
                true,
                &mut init_rng,
            )?));

        let classifier = TransferClassifier {
            backbone,
            head,
            config: config.clone(),
            training: true,
        };
        info!(
            "Built classifier: backbone [{}], head [{}], {} trainable parameters",
            classifier.backbone.layer_names().join(", "),
            classifier.head.layer_names().join(", "),
            classifier.num_parameters()
        );
        Ok(classifier)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn num_features(&self) -> usize {
        Self::INPUT_CHANNELS * self.config.pool_size * self.config.pool_size
    }
}

impl Model for TransferClassifier {
    fn forward(&mut self, input: &Tensor, grad_enabled: bool) -> Result<Tensor, TrainingError> {
        if input.shape.len() != 4 || input.shape[1] != Self::INPUT_CHANNELS {
            return Err(TrainingError::InvalidShape(format!(
                "classifier expects [batch, 3, height, width], got {:?}",
                input.shape
            )));
        }

        let features = self.backbone.forward(input, false)?;
        self.head.forward(&features, grad_enabled)
    }

    /// Stops at the backbone output; the returned gradient is with respect
    /// to the pooled features.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, TrainingError> {
        if !self.training {
            return Err(TrainingError::InvalidBackward(
                "Model not in training mode".into(),
            ));
        }
        self.head.backward(grad)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.head.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.head.parameters_mut()
    }

    fn train(&mut self) {
        self.training = true;
        self.backbone.train();
        self.head.train();
    }

    fn eval(&mut self) {
        self.training = false;
        self.backbone.eval();
        self.head.eval();
    }

    fn is_training(&self) -> bool {
        self.training
    }
}
