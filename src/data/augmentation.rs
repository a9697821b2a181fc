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
use crate::data::transform::{Sample, Transform};
use image::imageops::{self, FilterType};
use rand::{Rng, RngCore};

/// Crops a random region covering `scale` of the image area with an aspect
/// ratio drawn log-uniformly from `ratio`, then resizes it to `size x size`.
pub struct RandomResizedCrop {
    size: u32,
    scale: (f64, f64),
    ratio: (f64, f64),
}

impl RandomResizedCrop {
    const MAX_ATTEMPTS: usize = 10;

    pub fn new(size: u32, scale: (f64, f64)) -> Result<Self, TrainingError> {
        Self::with_ratio(size, scale, (3.0 / 4.0, 4.0 / 3.0))
    }

    pub fn with_ratio(
        size: u32,
        scale: (f64, f64),
        ratio: (f64, f64),
    ) -> Result<Self, TrainingError> {
        if size == 0 {
            return Err(TrainingError::InvalidParameter(
                "crop size must be greater than 0".into(),
            ));
        }
        if !(scale.0 > 0.0 && scale.0 <= scale.1 && scale.1 <= 1.0) {
            return Err(TrainingError::InvalidParameter(format!(
                "scale range {:?} must satisfy 0 < min <= max <= 1",
                scale
            )));
        }
        if !(ratio.0 > 0.0 && ratio.0 <= ratio.1) {
            return Err(TrainingError::InvalidParameter(format!(
                "aspect ratio range {:?} must satisfy 0 < min <= max",
                ratio
            )));
        }

        Ok(Self { size, scale, ratio })
    }

    /// Returns `(left, top, width, height)` of the region to crop.
    fn crop_region(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> (u32, u32, u32, u32) {
        let area = width as f64 * height as f64;
        let log_ratio = (self.ratio.0.ln(), self.ratio.1.ln());

        for _ in 0..Self::MAX_ATTEMPTS {
            let target_area = area * rng.gen_range(self.scale.0..=self.scale.1);
            let aspect = rng.gen_range(log_ratio.0..=log_ratio.1).exp();

            let w = (target_area * aspect).sqrt().round() as u32;
            let h = (target_area / aspect).sqrt().round() as u32;

            if w > 0 && w <= width && h > 0 && h <= height {
                let top = rng.gen_range(0..=height - h);
                let left = rng.gen_range(0..=width - w);
                return (left, top, w, h);
            }
        }

        // Fall back to a centered crop with the aspect ratio clamped.
        let in_ratio = width as f64 / height as f64;
        let (w, h) = if in_ratio < self.ratio.0 {
            (width, ((width as f64 / self.ratio.0).round() as u32).clamp(1, height))
        } else if in_ratio > self.ratio.1 {
            (((height as f64 * self.ratio.1).round() as u32).clamp(1, width), height)
        } else {
            (width, height)
        };
        ((width - w) / 2, (height - h) / 2, w, h)
    }
}

impl Transform for RandomResizedCrop {
    fn apply(&self, sample: Sample, rng: &mut dyn RngCore) -> Result<Sample, TrainingError> {
        let image = sample.into_image(self.name())?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(TrainingError::InvalidShape("cannot crop an empty image".into()));
        }

        let (left, top, w, h) = self.crop_region(width, height, rng);
        let cropped = imageops::crop_imm(&image, left, top, w, h).to_image();

        Ok(Sample::Image(imageops::resize(
            &cropped,
            self.size,
            self.size,
            FilterType::Triangle,
        )))
    }

    fn name(&self) -> &str {
        "RandomResizedCrop"
    }
}

pub struct RandomHorizontalFlip {
    p: f32,
}

impl RandomHorizontalFlip {
    pub fn new(p: f32) -> Result<Self, TrainingError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(TrainingError::InvalidParameter(format!(
                "flip probability {} must be between 0 and 1",
                p
            )));
        }
        Ok(RandomHorizontalFlip { p })
    }
}

impl Transform for RandomHorizontalFlip {
    fn apply(&self, sample: Sample, rng: &mut dyn RngCore) -> Result<Sample, TrainingError> {
        let image = sample.into_image(self.name())?;
        if rng.gen::<f32>() >= self.p {
            return Ok(Sample::Image(image));
        }
        Ok(Sample::Image(imageops::flip_horizontal(&image)))
    }

    fn name(&self) -> &str {
        "RandomHorizontalFlip"
    }
}
