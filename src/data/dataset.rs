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
use crate::data::{image_decoder, preprocessing::ImageTransform};
use log::debug;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Indexable, length-queryable collection of `(input, class index)` pairs.
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads element `index`; random transforms draw from `rng`.
    fn get(&self, index: usize, rng: &mut dyn RngCore) -> Result<(Tensor, usize), TrainingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ants = 0,
    Bees = 1,
}

impl Label {
    pub const NUM_CLASSES: usize = 2;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Label::Ants => "ants",
            Label::Bees => "bees",
        }
    }

    pub fn from_class_name(name: &str) -> Option<Label> {
        match name {
            "ants" => Some(Label::Ants),
            "bees" => Some(Label::Bees),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Derives the class of an image from its parent directory name.
pub fn label_for_path(path: &Path) -> Result<Label, TrainingError> {
    let class = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Label::from_class_name(&class).ok_or_else(|| TrainingError::UnrecognizedClass {
        path: path.to_path_buf(),
        class,
    })
}

/// Ants/bees images for one phase, labeled by their class directory.
pub struct HymenopteraDataset {
    samples: Vec<(PathBuf, Label)>,
    transform: Arc<ImageTransform>,
    phase: Phase,
}

impl HymenopteraDataset {
    /// Fails on the first path whose parent directory is not a known class.
    pub fn new(
        file_list: Vec<PathBuf>,
        transform: Arc<ImageTransform>,
        phase: Phase,
    ) -> Result<Self, TrainingError> {
        let samples = file_list
            .into_iter()
            .map(|path| label_for_path(&path).map(|label| (path, label)))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "{} dataset: {} ants, {} bees",
            phase,
            samples.iter().filter(|(_, l)| *l == Label::Ants).count(),
            samples.iter().filter(|(_, l)| *l == Label::Bees).count()
        );

        Ok(HymenopteraDataset {
            samples,
            transform,
            phase,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.samples.get(index).map(|(path, _)| path.as_path())
    }

    pub fn label(&self, index: usize) -> Option<Label> {
        self.samples.get(index).map(|&(_, label)| label)
    }
}

impl Dataset for HymenopteraDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize, rng: &mut dyn RngCore) -> Result<(Tensor, usize), TrainingError> {
        let (path, label) = self
            .samples
            .get(index)
            .ok_or(TrainingError::IndexOutOfBounds {
                index,
                len: self.samples.len(),
            })?;

        let image = image_decoder::load_rgb(path)?;
        let img_transformed = self.transform.apply(image, self.phase, rng)?;

        Ok((img_transformed, label.index()))
    }
}
