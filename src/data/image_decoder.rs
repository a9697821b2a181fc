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
use image::RgbImage;
use std::path::Path;

/// Opens an image file and converts it to 8-bit RGB.
///
/// Grayscale, palette and alpha images are all accepted; the format is
/// detected from the file contents.
pub fn load_rgb(path: &Path) -> Result<RgbImage, TrainingError> {
    let image = image::open(path).map_err(|source| TrainingError::ImageError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

/// Channel-first `[3, H, W]` tensor with pixel values scaled to [0, 1].
pub fn rgb_to_tensor(image: &RgbImage) -> Result<Tensor, TrainingError> {
    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);
    let plane = width * height;
    let mut data = vec![0.0; 3 * plane];

    for (x, y, pixel) in image.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        for c in 0..3 {
            data[c * plane + offset] = pixel.0[c] as f32 / 255.0;
        }
    }

    Tensor::new(data, vec![3, height, width])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_is_channel_first() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(1, 0, image::Rgb([255, 0, 51]));
        let tensor = rgb_to_tensor(&image).unwrap();
        assert_eq!(tensor.shape(), &[3, 1, 2]);
        assert_eq!(tensor.data(), &[0.0, 1.0, 0.0, 0.0, 0.0, 0.2]);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_rgb(Path::new("/nonexistent/ants/missing.jpg")).unwrap_err();
        match err {
            TrainingError::ImageError { path, .. } => {
                assert!(path.ends_with("ants/missing.jpg"))
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
