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

use crate::core::{error::TrainingError, phase::Phase, random::derive_seed};
use crate::data::{
    dataloader::DataLoader,
    dataset::{Dataset, HymenopteraDataset},
    path_lister::make_datapath_list,
    preprocessing::ImageTransform,
};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::models::classifier::TransferClassifier;
use crate::optim::sgd::SGD;
use crate::training::{
    history::TrainingHistory,
    trainer::{DataLoaders, Trainer},
};
use crate::utilities::config::Configuration;
use log::info;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod core;
pub mod data;
pub mod layer;
pub mod loss;
pub mod models;
pub mod optim;
pub mod training;
pub mod utilities;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const FRAMEWORK_NAME: &str = "Bellande Hymenoptera Classifier";

/// Wires a `Configuration` into the full pipeline: path lists, datasets,
/// data loaders, the classifier, its loss and optimizer, and the trainer.
pub struct Framework {
    config: Configuration,
}

impl Framework {
    pub fn new(config: Configuration) -> Result<Self, TrainingError> {
        config.validate()?;
        Ok(Framework { config })
    }

    pub fn with_config<P: AsRef<Path>>(config_path: P) -> Result<Self, TrainingError> {
        Ok(Framework {
            config: Configuration::from_file(config_path)?,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn image_transform(&self) -> Result<ImageTransform, TrainingError> {
        let data = &self.config.data;
        ImageTransform::new(data.resize, data.mean, data.std)
    }

    pub fn build_dataset(
        &self,
        phase: Phase,
        transform: Arc<ImageTransform>,
    ) -> Result<HymenopteraDataset, TrainingError> {
        let paths = make_datapath_list(&self.config.data.root, phase)?;
        HymenopteraDataset::new(paths, transform, phase)
    }

    /// Train batches are shuffled, val batches keep path order.
    pub fn build_dataloaders(&self) -> Result<DataLoaders, TrainingError> {
        let transform = Arc::new(self.image_transform()?);
        let system = &self.config.system;

        let loader = |phase: Phase, salt: u64| -> Result<DataLoader, TrainingError> {
            let dataset = self.build_dataset(phase, transform.clone())?;
            info!("{} dataset: {} images", phase, dataset.len());
            DataLoader::new(
                Arc::new(dataset),
                self.config.training.batch_size,
                phase.is_train(),
                derive_seed(system.seed, salt),
            )?
            .with_num_workers(system.num_workers)
        };

        let train = loader(Phase::Train, 0)?;
        let val = loader(Phase::Val, 1)?;
        Ok(DataLoaders::new(Box::new(train), Box::new(val)))
    }

    pub fn build_trainer(&self) -> Result<Trainer, TrainingError> {
        let training = &self.config.training;
        let model =
            TransferClassifier::build(&self.config.model_config(), self.config.system.seed)?;
        let optimizer = SGD::new(training.learning_rate, training.momentum)?;

        Ok(Trainer::new(
            Box::new(model),
            Box::new(optimizer),
            Box::new(CrossEntropyLoss::default()),
        )
        .with_skip_initial_train(training.skip_initial_train)
        .with_progress(self.config.system.show_progress))
    }

    /// Builds everything and trains for the configured number of epochs,
    /// writing the report lines to `out`.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<TrainingHistory, TrainingError> {
        let mut dataloaders = self.build_dataloaders()?;
        let mut trainer = self.build_trainer()?;
        trainer.fit(&mut dataloaders, self.config.training.epochs, out)
    }

    pub fn get_version() -> &'static str {
        VERSION
    }

    pub fn get_name() -> &'static str {
        FRAMEWORK_NAME
    }

    pub fn system_info() -> String {
        format!(
            "{} v{}\n\
            CPU Threads: {}",
            FRAMEWORK_NAME,
            VERSION,
            num_cpus::get(),
        )
    }
}
