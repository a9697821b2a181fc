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

use crate::core::{error::TrainingError, phase::Phase, tensor::Tensor};
use crate::training::history::PhaseSummary;

/// Number of rows of `outputs` whose arg-max equals the target class.
pub fn count_correct(outputs: &Tensor, targets: &[usize]) -> Result<usize, TrainingError> {
    let predictions = outputs.argmax_rows()?;
    if predictions.len() != targets.len() {
        return Err(TrainingError::ShapeMismatch(format!(
            "{} predictions for {} targets",
            predictions.len(),
            targets.len()
        )));
    }
    Ok(predictions
        .iter()
        .zip(targets)
        .filter(|(p, t)| p == t)
        .count())
}

/// Running loss and correct count for one (epoch, phase) pass.
///
/// The loss sum is weighted by batch size, so finalizing over the dataset
/// size gives the per-sample mean even when the last batch is short.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    epoch: usize,
    phase: Phase,
    loss_sum: f64,
    corrects: usize,
    seen: usize,
}

impl EpochMetrics {
    pub fn new(epoch: usize, phase: Phase) -> Self {
        EpochMetrics {
            epoch,
            phase,
            loss_sum: 0.0,
            corrects: 0,
            seen: 0,
        }
    }

    pub fn update(&mut self, batch_loss: f32, batch_size: usize, corrects: usize) {
        self.loss_sum += f64::from(batch_loss) * batch_size as f64;
        self.corrects += corrects;
        self.seen += batch_size;
    }

    pub fn corrects(&self) -> usize {
        self.corrects
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Mean loss over the samples seen so far.
    pub fn running_loss(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            self.loss_sum / self.seen as f64
        }
    }

    pub fn finalize(&self, dataset_size: usize) -> Result<PhaseSummary, TrainingError> {
        if dataset_size == 0 {
            return Err(TrainingError::EmptyDataset(self.phase));
        }

        let size = dataset_size as f64;
        Ok(PhaseSummary {
            epoch: self.epoch,
            phase: self.phase,
            loss: self.loss_sum / size,
            accuracy: self.corrects as f64 / size,
        })
    }
}
