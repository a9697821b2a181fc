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

use crate::core::phase::Phase;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Image error: failed to load {path}: {source}")]
    ImageError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Unknown phase {0:?}, expected \"train\" or \"val\"")]
    UnknownPhase(String),
    #[error("Unrecognized class {class:?} for image {path}, expected \"ants\" or \"bees\"")]
    UnrecognizedClass { path: PathBuf, class: String },
    #[error("Dataset for phase {0} is empty")]
    EmptyDataset(Phase),
    #[error("Index out of bounds: index {index} but length is {len}")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Invalid tensor shape: {0}")]
    InvalidShape(String),
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),
    #[error("Invalid backward operation: {0}")]
    InvalidBackward(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Glob pattern error: {0}")]
    PatternError(#[from] glob::PatternError),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
