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

use bellande_hymenoptera_classifier::{utilities::config::Configuration, Framework};
use clap::Parser;
use log::info;
use std::io::stdout;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing train/ and val/
    #[arg(long)]
    data_root: Option<PathBuf>,

    #[arg(short, long)]
    epochs: Option<usize>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Threads used to decode images
    #[arg(long)]
    workers: Option<usize>,

    /// Hide the per-batch progress bar
    #[arg(long)]
    no_progress: bool,

    /// Write the per-phase loss/accuracy history to this JSON file
    #[arg(long)]
    history: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Configuration) {
        if let Some(root) = &self.data_root {
            config.data.root = root.clone();
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.training.batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            config.system.seed = seed;
        }
        if let Some(workers) = self.workers {
            config.system.num_workers = workers;
        }
        if self.no_progress {
            config.system.show_progress = false;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::default(),
    };
    args.apply(&mut config);

    let framework = Framework::new(config)?;
    info!("{}", Framework::system_info().replace('\n', ", "));

    let start_time = Instant::now();
    let history = framework.run(&mut stdout().lock())?;
    info!("Training finished in {:.2?}", start_time.elapsed());

    if let Some(best) = history.best_val() {
        info!("Best val accuracy {:.4} in epoch {}", best.accuracy, best.epoch + 1);
    }

    if let Some(path) = &args.history {
        history.save(path)?;
        info!("Saved training history to {}", path.display());
    }

    Ok(())
}
