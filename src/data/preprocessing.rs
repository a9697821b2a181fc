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
use crate::data::augmentation::{RandomHorizontalFlip, RandomResizedCrop};
use crate::data::transform::{CenterCrop, Compose, Resize, Sample, ToTensor, Transform};
use image::RgbImage;
use rand::RngCore;

/// Per-channel `(x - mean[c]) / std[c]` over a `[C, H, W]` tensor.
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self, TrainingError> {
        if mean.len() != std.len() {
            return Err(TrainingError::InvalidParameter(format!(
                "mean has {} channels but std has {}",
                mean.len(),
                std.len()
            )));
        }
        if std.iter().any(|&s| !(s > 0.0)) {
            return Err(TrainingError::InvalidParameter(
                "std values must be positive".into(),
            ));
        }
        Ok(Normalize { mean, std })
    }

    fn process(&self, tensor: Tensor) -> Result<Tensor, TrainingError> {
        if tensor.shape.len() != 3 {
            return Err(TrainingError::InvalidShape(format!(
                "Normalize expects [C, H, W], got {:?}",
                tensor.shape
            )));
        }

        let channels = tensor.shape[0];
        if channels != self.mean.len() {
            return Err(TrainingError::ShapeMismatch(format!(
                "tensor has {} channels but Normalize has {}",
                channels,
                self.mean.len()
            )));
        }

        let plane = tensor.shape[1] * tensor.shape[2];
        let mut tensor = tensor;
        for (c, chunk) in tensor.data.chunks_mut(plane.max(1)).enumerate().take(channels) {
            for value in chunk.iter_mut() {
                *value = (*value - self.mean[c]) / self.std[c];
            }
        }
        Ok(tensor)
    }
}

impl Transform for Normalize {
    fn apply(&self, sample: Sample, _rng: &mut dyn RngCore) -> Result<Sample, TrainingError> {
        let tensor = sample.into_tensor(self.name())?;
        Ok(Sample::Tensor(self.process(tensor)?))
    }

    fn name(&self) -> &str {
        "Normalize"
    }
}

/// The two named preprocessing pipelines.
///
/// `train` augments (random resized crop with scale [0.5, 1.0], random
/// horizontal flip); `val` is deterministic (resize, center crop). Both end
/// with `ToTensor` and `Normalize`, so every output is `[3, resize, resize]`.
pub struct ImageTransform {
    resize: u32,
    train: Compose,
    val: Compose,
}

impl ImageTransform {
    pub fn new(resize: u32, mean: [f32; 3], std: [f32; 3]) -> Result<Self, TrainingError> {
        if resize == 0 {
            return Err(TrainingError::InvalidParameter(
                "resize must be greater than 0".into(),
            ));
        }

        let train = Compose::new(vec![
            Box::new(RandomResizedCrop::new(resize, (0.5, 1.0))?),
            Box::new(RandomHorizontalFlip::new(0.5)?),
            Box::new(ToTensor),
            Box::new(Normalize::new(mean.to_vec(), std.to_vec())?),
        ]);

        let val = Compose::new(vec![
            Box::new(Resize::new(resize)),
            Box::new(CenterCrop::new(resize)),
            Box::new(ToTensor),
            Box::new(Normalize::new(mean.to_vec(), std.to_vec())?),
        ]);

        Ok(ImageTransform { resize, train, val })
    }

    pub fn resize(&self) -> u32 {
        self.resize
    }

    pub fn pipeline(&self, phase: Phase) -> &Compose {
        match phase {
            Phase::Train => &self.train,
            Phase::Val => &self.val,
        }
    }

    pub fn apply(
        &self,
        image: RgbImage,
        phase: Phase,
        rng: &mut dyn RngCore,
    ) -> Result<Tensor, TrainingError> {
        self.pipeline(phase)
            .apply(Sample::Image(image), rng)?
            .into_tensor("ImageTransform")
    }

    /// Like `apply`, with the phase given by name (`"train"` or `"val"`).
    pub fn apply_named(
        &self,
        image: RgbImage,
        phase: &str,
        rng: &mut dyn RngCore,
    ) -> Result<Tensor, TrainingError> {
        self.apply(image, phase.parse()?, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    const STD: [f32; 3] = [0.229, 0.224, 0.225];

    fn noisy_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn both_phases_produce_fixed_size_tensors() {
        let transform = ImageTransform::new(32, MEAN, STD).unwrap();
        let mut rng = StdRng::seed_from_u64(1234);
        for &(w, h) in &[(10, 10), (32, 32), (120, 45), (40, 300)] {
            for phase in Phase::ALL {
                let out = transform.apply(noisy_image(w, h), phase, &mut rng).unwrap();
                assert_eq!(out.shape(), &[3, 32, 32], "{:?} {}x{}", phase, w, h);
            }
        }
    }

    #[test]
    fn val_pipeline_is_deterministic() {
        let transform = ImageTransform::new(16, MEAN, STD).unwrap();
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(2);
        let first = transform.apply(noisy_image(50, 30), Phase::Val, &mut a).unwrap();
        let second = transform.apply(noisy_image(50, 30), Phase::Val, &mut b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn normalize_uses_per_channel_statistics() {
        let normalize = Normalize::new(vec![0.5, 0.0, 1.0], vec![0.5, 1.0, 2.0]).unwrap();
        let tensor = Tensor::new(vec![1.0, 0.0, 0.25, 0.5, 1.0, 3.0], vec![3, 1, 2]).unwrap();
        let out = normalize.process(tensor).unwrap();
        assert_eq!(out.data(), &[1.0, -1.0, 0.25, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        assert!(ImageTransform::new(0, MEAN, STD).is_err());
        assert!(ImageTransform::new(8, MEAN, [0.2, 0.0, 0.2]).is_err());
        assert!(Normalize::new(vec![0.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn unknown_phase_name_fails() {
        let transform = ImageTransform::new(8, MEAN, STD).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = transform
            .apply_named(noisy_image(8, 8), "test", &mut rng)
            .unwrap_err();
        assert!(matches!(err, TrainingError::UnknownPhase(_)));
        assert!(transform.apply_named(noisy_image(8, 8), "val", &mut rng).is_ok());
    }
}
