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
use crate::models::models::ModelConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Run configuration, read from YAML. Every section and field is optional
/// in the file; missing values take the defaults below.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Configuration {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub model: ClassifierConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `train/` and `val/`.
    pub root: PathBuf,
    pub resize: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    /// Evaluate the untrained model in the first epoch instead of training it.
    pub skip_initial_train: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub pool_size: usize,
    pub dropout_rate: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    pub num_workers: usize,
    pub seed: u64,
    pub show_progress: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            root: PathBuf::from("./hymenoptera_data"),
            resize: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            batch_size: 32,
            epochs: 2,
            learning_rate: 0.001,
            momentum: 0.9,
            skip_initial_train: true,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let model = ModelConfig::default();
        ClassifierConfig {
            pool_size: model.pool_size,
            dropout_rate: model.dropout_rate,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            num_workers: num_cpus::get(),
            seed: 1234,
            show_progress: true,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            data: DataConfig::default(),
            training: TrainingConfig::default(),
            model: ClassifierConfig::default(),
            system: SystemConfig::default(),
        }
    }
}

impl Configuration {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let content = fs::read_to_string(path)?;
        let config: Configuration = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainingError> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        let invalid = |msg: &str| Err(TrainingError::InvalidConfiguration(msg.to_string()));

        if self.training.batch_size == 0 {
            return invalid("Batch size must be greater than 0");
        }

        if !(self.training.learning_rate > 0.0) {
            return invalid("Learning rate must be positive");
        }

        if !(0.0..=1.0).contains(&self.training.momentum) {
            return invalid("Momentum must be between 0 and 1");
        }

        if self.data.resize == 0 {
            return invalid("Resize must be greater than 0");
        }

        if self.data.std.iter().any(|&s| !(s > 0.0)) {
            return invalid("Normalization std values must be positive");
        }

        if !(0.0..1.0).contains(&self.model.dropout_rate) {
            return invalid("Dropout rate must be in [0, 1)");
        }

        if self.model.pool_size == 0 {
            return invalid("Pool size must be greater than 0");
        }

        if self.system.num_workers == 0 {
            return invalid("Number of workers must be greater than 0");
        }

        Ok(())
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            num_classes: crate::data::dataset::Label::NUM_CLASSES,
            pool_size: self.model.pool_size,
            dropout_rate: self.model.dropout_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_reference_run() {
        let config = Configuration::default();
        assert_eq!(config.data.root, PathBuf::from("./hymenoptera_data"));
        assert_eq!(config.data.resize, 224);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.system.seed, 1234);
        assert!(config.training.skip_initial_train);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Configuration = serde_yaml::from_str(
            "training:\n  epochs: 5\nsystem:\n  seed: 7\n",
        )
        .unwrap();
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.system.seed, 7);
        assert_eq!(config.data.mean, [0.485, 0.456, 0.406]);
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Configuration::default();
        config.training.learning_rate = 0.01;
        config.save(&path).unwrap();
        assert_eq!(Configuration::from_file(&path).unwrap(), config);
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = Configuration::default();
        config.training.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Configuration::default();
        config.training.momentum = 1.5;
        assert!(config.validate().is_err());

        let mut config = Configuration::default();
        config.model.dropout_rate = 1.0;
        assert!(config.validate().is_err());

        let mut config = Configuration::default();
        config.data.std = [0.2, 0.0, 0.2];
        assert!(matches!(
            config.validate(),
            Err(TrainingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn model_config_is_binary() {
        assert_eq!(Configuration::default().model_config().num_classes, 2);
    }
}
