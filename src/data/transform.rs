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
use crate::data::image_decoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use rand::RngCore;

/// Value flowing through a transform pipeline: a decoded image until
/// `ToTensor` runs, a `[C, H, W]` tensor afterwards.
#[derive(Clone, Debug)]
pub enum Sample {
    Image(RgbImage),
    Tensor(Tensor),
}

impl Sample {
    pub fn into_image(self, transform: &str) -> Result<RgbImage, TrainingError> {
        match self {
            Sample::Image(image) => Ok(image),
            Sample::Tensor(_) => Err(TrainingError::InvalidOperation(format!(
                "{} expects an image but received a tensor",
                transform
            ))),
        }
    }

    pub fn into_tensor(self, transform: &str) -> Result<Tensor, TrainingError> {
        match self {
            Sample::Tensor(tensor) => Ok(tensor),
            Sample::Image(_) => Err(TrainingError::InvalidOperation(format!(
                "{} expects a tensor but received an image",
                transform
            ))),
        }
    }
}

pub trait Transform: Send + Sync {
    fn apply(&self, sample: Sample, rng: &mut dyn RngCore) -> Result<Sample, TrainingError>;
    fn name(&self) -> &str;
}

pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new(transforms: Vec<Box<dyn Transform>>) -> Self {
        Compose { transforms }
    }

    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }
}

impl Transform for Compose {
    fn apply(&self, sample: Sample, rng: &mut dyn RngCore) -> Result<Sample, TrainingError> {
        let mut current = sample;
        for transform in &self.transforms {
            current = transform.apply(current, rng)?;
        }
        Ok(current)
    }

    fn name(&self) -> &str {
        "Compose"
    }
}

/// Resizes the shorter edge to `size`, keeping the aspect ratio.
pub struct Resize {
    size: u32,
}

impl Resize {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Transform for Resize {
    fn apply(&self, sample: Sample, _rng: &mut dyn RngCore) -> Result<Sample, TrainingError> {
        let image = sample.into_image(self.name())?;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(TrainingError::InvalidShape("cannot resize an empty image".into()));
        }

        let (new_width, new_height) = if width <= height {
            let h = (self.size as u64 * height as u64 / width as u64) as u32;
            (self.size, h.max(1))
        } else {
            let w = (self.size as u64 * width as u64 / height as u64) as u32;
            (w.max(1), self.size)
        };

        if (new_width, new_height) == (width, height) {
            return Ok(Sample::Image(image));
        }

        Ok(Sample::Image(imageops::resize(
            &image,
            new_width,
            new_height,
            FilterType::Triangle,
        )))
    }

    fn name(&self) -> &str {
        "Resize"
    }
}

/// Crops the central `size x size` region, zero-padding smaller images.
pub struct CenterCrop {
    size: u32,
}

impl CenterCrop {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Transform for CenterCrop {
    fn apply(&self, sample: Sample, _rng: &mut dyn RngCore) -> Result<Sample, TrainingError> {
        let mut image = sample.into_image(self.name())?;
        let (width, height) = image.dimensions();

        if width < self.size || height < self.size {
            let padded_width = width.max(self.size);
            let padded_height = height.max(self.size);
            let mut canvas = RgbImage::new(padded_width, padded_height);
            imageops::overlay(
                &mut canvas,
                &image,
                ((padded_width - width) / 2) as i64,
                ((padded_height - height) / 2) as i64,
            );
            image = canvas;
        }

        let (width, height) = image.dimensions();
        let top = ((height - self.size) as f64 / 2.0).round() as u32;
        let left = ((width - self.size) as f64 / 2.0).round() as u32;

        Ok(Sample::Image(
            imageops::crop_imm(&image, left, top, self.size, self.size).to_image(),
        ))
    }

    fn name(&self) -> &str {
        "CenterCrop"
    }
}

/// Converts an RGB image into a `[3, H, W]` tensor with values in [0, 1].
pub struct ToTensor;

impl Transform for ToTensor {
    fn apply(&self, sample: Sample, _rng: &mut dyn RngCore) -> Result<Sample, TrainingError> {
        let image = sample.into_image(self.name())?;
        Ok(Sample::Tensor(image_decoder::rgb_to_tensor(&image)?))
    }

    fn name(&self) -> &str {
        "ToTensor"
    }
}
