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

use crate::core::{error::TrainingError, phase::Phase};
use crate::data::dataloader::{Batch, BatchSource};
use crate::loss::{utils::scalar, Loss};
use crate::models::models::Model;
use crate::optim::Optimizer;
use crate::training::{
    history::TrainingHistory,
    metrics::{count_correct, EpochMetrics},
};
use crate::utilities::progress::ProgressBar;
use log::{debug, info};
use std::io::Write;

/// Printed under every `Epoch<k>/<N>` line.
pub const SEPARATOR: &str = "--------------";

/// One batch source per phase.
pub struct DataLoaders {
    pub train: Box<dyn BatchSource>,
    pub val: Box<dyn BatchSource>,
}

impl DataLoaders {
    pub fn new(train: Box<dyn BatchSource>, val: Box<dyn BatchSource>) -> Self {
        DataLoaders { train, val }
    }

    pub fn get(&self, phase: Phase) -> &dyn BatchSource {
        match phase {
            Phase::Train => self.train.as_ref(),
            Phase::Val => self.val.as_ref(),
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut dyn BatchSource {
        match phase {
            Phase::Train => self.train.as_mut(),
            Phase::Val => self.val.as_mut(),
        }
    }
}

/// Runs the fixed-epoch train/val loop and reports per-phase loss and
/// accuracy.
///
/// Every epoch visits `train` then `val`. The model is switched to train
/// or eval mode at the start of each phase, gradients are only enabled and
/// parameters only updated in `train`, and the first epoch's `train` phase
/// is skipped by default so the first report is a baseline validation score.
pub struct Trainer {
    model: Box<dyn Model>,
    optimizer: Box<dyn Optimizer>,
    loss_fn: Box<dyn Loss>,
    skip_initial_train: bool,
    show_progress: bool,
    history: TrainingHistory,
}

impl Trainer {
    pub fn new(
        model: Box<dyn Model>,
        optimizer: Box<dyn Optimizer>,
        loss_fn: Box<dyn Loss>,
    ) -> Self {
        Trainer {
            model,
            optimizer,
            loss_fn,
            skip_initial_train: true,
            show_progress: true,
            history: TrainingHistory::new(),
        }
    }

    pub fn with_skip_initial_train(mut self, skip: bool) -> Self {
        self.skip_initial_train = skip;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    fn runs_phase(&self, epoch: usize, phase: Phase) -> bool {
        !(self.skip_initial_train && epoch == 0 && phase.is_train())
    }

    /// Fails with `EmptyDataset` for any phase that will run but has no data.
    fn check_datasets(
        &self,
        dataloaders: &DataLoaders,
        num_epochs: usize,
    ) -> Result<(), TrainingError> {
        for phase in Phase::ALL {
            let will_run = (0..num_epochs).any(|epoch| self.runs_phase(epoch, phase));
            if will_run && dataloaders.get(phase).dataset_len() == 0 {
                return Err(TrainingError::EmptyDataset(phase));
            }
        }
        Ok(())
    }

    pub fn fit<W: Write>(
        &mut self,
        dataloaders: &mut DataLoaders,
        num_epochs: usize,
        out: &mut W,
    ) -> Result<TrainingHistory, TrainingError> {
        self.check_datasets(dataloaders, num_epochs)?;
        self.history = TrainingHistory::new();
        info!(
            "Training for {} epochs: {} train / {} val samples, optimizer {} (lr {}), loss {}",
            num_epochs,
            dataloaders.train.dataset_len(),
            dataloaders.val.dataset_len(),
            self.optimizer.name(),
            self.optimizer.get_lr(),
            self.loss_fn.name()
        );

        for epoch in 0..num_epochs {
            writeln!(out, "Epoch{}/{}", epoch + 1, num_epochs)?;
            writeln!(out, "{}", SEPARATOR)?;

            for phase in Phase::ALL {
                if phase.is_train() {
                    self.model.train();
                } else {
                    self.model.eval();
                }

                let mut metrics = EpochMetrics::new(epoch, phase);

                if !self.runs_phase(epoch, phase) {
                    debug!("Skipping {} in epoch {} for a baseline", phase, epoch + 1);
                    continue;
                }

                let loader = dataloaders.get_mut(phase);
                self.run_phase(loader, phase, &mut metrics)?;

                let summary = metrics.finalize(loader.dataset_len())?;
                writeln!(out, "{}", summary)?;
                info!("Epoch {}/{} {}", epoch + 1, num_epochs, summary);
                self.history.update(summary);
            }
        }

        out.flush()?;
        Ok(self.history.clone())
    }

    fn run_phase(
        &mut self,
        loader: &mut dyn BatchSource,
        phase: Phase,
        metrics: &mut EpochMetrics,
    ) -> Result<(), TrainingError> {
        let dataset_len = loader.dataset_len();
        let mut progress = if self.show_progress {
            ProgressBar::new(phase.as_str(), loader.num_batches())
        } else {
            ProgressBar::hidden(phase.as_str(), loader.num_batches())
        };

        for batch in loader.batches() {
            let batch = batch?;
            self.step(&batch, phase, metrics)?;
            progress.update(1);
        }
        progress.finish();

        if metrics.seen() > dataset_len {
            return Err(TrainingError::InvalidInputs(format!(
                "{} batches held {} samples for a dataset of {}",
                phase,
                metrics.seen(),
                dataset_len
            )));
        }
        Ok(())
    }

    fn step(
        &mut self,
        batch: &Batch,
        phase: Phase,
        metrics: &mut EpochMetrics,
    ) -> Result<(), TrainingError> {
        let grad_enabled = phase.is_train();

        self.optimizer.zero_grad(&mut self.model.parameters_mut());

        let outputs = self.model.forward(&batch.inputs, grad_enabled)?;
        let loss = scalar(&self.loss_fn.forward(&outputs, &batch.labels)?)?;
        let corrects = count_correct(&outputs, &batch.labels)?;

        if grad_enabled {
            let grad = self.loss_fn.backward(&outputs, &batch.labels)?;
            self.model.backward(&grad)?;
            self.optimizer.step(&mut self.model.parameters_mut())?;
        }

        metrics.update(loss, batch.len(), corrects);
        debug!(
            "{} batch of {}: loss {:.4}, {} correct, running loss {:.4}",
            phase,
            batch.len(),
            loss,
            corrects,
            metrics.running_loss()
        );
        Ok(())
    }
}

/// Runs `num_epochs` epochs of `net` with the default trainer settings
/// (initial train phase skipped, no progress bar) and returns the history.
pub fn train_model<W: Write>(
    net: Box<dyn Model>,
    dataloaders: &mut DataLoaders,
    criterion: Box<dyn Loss>,
    optimizer: Box<dyn Optimizer>,
    num_epochs: usize,
    out: &mut W,
) -> Result<TrainingHistory, TrainingError> {
    Trainer::new(net, optimizer, criterion)
        .with_progress(false)
        .fit(dataloaders, num_epochs, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tensor::Tensor;
    use crate::layer::linear::Linear;
    use crate::loss::cross_entropy::CrossEntropyLoss;
    use crate::models::sequential::Sequential;
    use crate::optim::sgd::SGD;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::{Arc, Mutex};

    /// Pre-built batches of `[n, 2]` features with labels.
    struct FixedBatches {
        batches: Vec<Batch>,
        fail_at: Option<usize>,
    }

    impl FixedBatches {
        fn new(samples: &[(f32, f32, usize)], batch_size: usize) -> Self {
            let batches = samples
                .chunks(batch_size)
                .map(|chunk| Batch {
                    inputs: Tensor::new(
                        chunk.iter().flat_map(|&(a, b, _)| [a, b]).collect(),
                        vec![chunk.len(), 2],
                    )
                    .unwrap(),
                    labels: chunk.iter().map(|&(_, _, l)| l).collect(),
                })
                .collect();
            FixedBatches {
                batches,
                fail_at: None,
            }
        }
    }

    impl BatchSource for FixedBatches {
        fn dataset_len(&self) -> usize {
            self.batches.iter().map(Batch::len).sum()
        }

        fn num_batches(&self) -> usize {
            self.batches.len()
        }

        fn batches(&mut self) -> Box<dyn Iterator<Item = Result<Batch, TrainingError>> + '_> {
            let fail_at = self.fail_at;
            Box::new(self.batches.iter().enumerate().map(move |(i, b)| {
                if Some(i) == fail_at {
                    Err(TrainingError::InvalidInputs("broken batch".into()))
                } else {
                    Ok(b.clone())
                }
            }))
        }
    }

    /// Records `(training mode, grad enabled)` for every forward call.
    struct RecordingModel {
        inner: Sequential,
        calls: Arc<Mutex<Vec<(bool, bool)>>>,
    }

    impl Model for RecordingModel {
        fn forward(
            &mut self,
            input: &Tensor,
            grad_enabled: bool,
        ) -> Result<Tensor, TrainingError> {
            self.calls
                .lock()
                .unwrap()
                .push((self.inner.is_training(), grad_enabled));
            self.inner.forward(input, grad_enabled)
        }

        fn backward(&mut self, grad: &Tensor) -> Result<Tensor, TrainingError> {
            self.inner.backward(grad)
        }

        fn parameters(&self) -> Vec<&Tensor> {
            self.inner.parameters()
        }

        fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
            self.inner.parameters_mut()
        }

        fn train(&mut self) {
            self.inner.train()
        }

        fn eval(&mut self) {
            self.inner.eval()
        }

        fn is_training(&self) -> bool {
            self.inner.is_training()
        }
    }

    fn linear_model() -> Sequential {
        let mut net = Sequential::new();
        net.add(Box::new(
            Linear::new(2, 2, true, &mut StdRng::seed_from_u64(1234)).unwrap(),
        ));
        net
    }

    fn train_samples() -> Vec<(f32, f32, usize)> {
        vec![(1.0, 0.0, 0), (0.9, 0.1, 0), (0.0, 1.0, 1), (0.1, 0.9, 1)]
    }

    fn val_samples() -> Vec<(f32, f32, usize)> {
        vec![(0.8, 0.2, 0), (0.2, 0.8, 1)]
    }

    fn loaders() -> DataLoaders {
        DataLoaders::new(
            Box::new(FixedBatches::new(&train_samples(), 2)),
            Box::new(FixedBatches::new(&val_samples(), 2)),
        )
    }

    fn trainer() -> Trainer {
        Trainer::new(
            Box::new(linear_model()),
            Box::new(SGD::new(0.1, 0.9).unwrap()),
            Box::new(CrossEntropyLoss::default()),
        )
        .with_progress(false)
    }

    fn run(trainer: &mut Trainer, epochs: usize) -> (TrainingHistory, Vec<String>) {
        let mut out = Vec::new();
        let history = trainer.fit(&mut loaders(), epochs, &mut out).unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (history, lines)
    }

    #[test]
    fn first_epoch_only_validates() {
        let mut trainer = trainer();
        let (history, lines) = run(&mut trainer, 1);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Epoch1/1");
        assert_eq!(lines[1], SEPARATOR);
        assert!(lines[2].starts_with("val Loss:"));
        assert_eq!(history.len(), 1);
        assert_eq!(trainer.optimizer().state().step, 0);
    }

    #[test]
    fn later_epochs_train_then_validate() {
        let mut trainer = trainer();
        let (history, lines) = run(&mut trainer, 2);

        assert_eq!(lines[0], "Epoch1/2");
        assert!(lines[2].starts_with("val "));
        assert_eq!(lines[3], "Epoch2/2");
        assert_eq!(lines[4], SEPARATOR);
        assert!(lines[5].starts_with("train "));
        assert!(lines[6].starts_with("val "));

        // two train batches in epoch 2
        assert_eq!(trainer.optimizer().state().step, 2);
        let train = history.last(Phase::Train).unwrap();
        assert_eq!(train.epoch, 1);
        assert!(train.loss >= 0.0);
        for record in &history.records {
            assert!((0.0..=1.0).contains(&record.accuracy));
        }
    }

    #[test]
    fn accuracy_is_a_multiple_of_one_over_size() {
        let (history, _) = run(&mut trainer(), 1);
        let acc = history.records[0].accuracy;
        assert!([0.0, 0.5, 1.0].contains(&acc), "accuracy {}", acc);
    }

    #[test]
    fn refitting_starts_a_fresh_history() {
        let mut trainer = trainer();
        let (first, _) = run(&mut trainer, 1);
        let (second, _) = run(&mut trainer, 2);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 3);
        assert_eq!(trainer.history().len(), 3);
        assert_eq!(second.records[0].epoch, 0);
    }

    #[test]
    fn phases_switch_mode_and_gradient_state() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let model = RecordingModel {
            inner: linear_model(),
            calls: calls.clone(),
        };
        let mut trainer = Trainer::new(
            Box::new(model),
            Box::new(SGD::new(0.1, 0.9).unwrap()),
            Box::new(CrossEntropyLoss::default()),
        )
        .with_progress(false);
        run(&mut trainer, 2);

        let calls = calls.lock().unwrap();
        // epoch 1: one val batch; epoch 2: two train batches, one val batch
        assert_eq!(
            *calls,
            vec![(false, false), (true, true), (true, true), (false, false)]
        );
    }

    #[test]
    fn initial_train_can_be_enabled() {
        let mut trainer = trainer().with_skip_initial_train(false);
        let (_, lines) = run(&mut trainer, 1);
        assert!(lines[2].starts_with("train "));
        assert!(lines[3].starts_with("val "));
        assert_eq!(trainer.optimizer().state().step, 2);
    }

    #[test]
    fn empty_phase_fails_before_any_output() {
        let mut out = Vec::new();
        let mut dataloaders = DataLoaders::new(
            Box::new(FixedBatches::new(&train_samples(), 2)),
            Box::new(FixedBatches::new(&[], 2)),
        );
        let err = trainer().fit(&mut dataloaders, 1, &mut out).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyDataset(Phase::Val)));
        assert!(out.is_empty());

        // an empty train set only matters once training actually runs
        let mut dataloaders = DataLoaders::new(
            Box::new(FixedBatches::new(&[], 2)),
            Box::new(FixedBatches::new(&val_samples(), 2)),
        );
        assert!(trainer().fit(&mut dataloaders, 1, &mut out).is_ok());
        assert!(matches!(
            trainer().fit(&mut dataloaders, 2, &mut Vec::new()),
            Err(TrainingError::EmptyDataset(Phase::Train))
        ));
    }

    #[test]
    fn batch_errors_abort_the_run() {
        let mut val = FixedBatches::new(&val_samples(), 1);
        val.fail_at = Some(1);
        let mut dataloaders =
            DataLoaders::new(Box::new(FixedBatches::new(&train_samples(), 2)), Box::new(val));
        let err = trainer()
            .fit(&mut dataloaders, 1, &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, TrainingError::InvalidInputs(_)));
    }

    #[test]
    fn training_reduces_loss_on_separable_data() {
        let mut trainer = trainer();
        let (history, _) = run(&mut trainer, 30);
        let first = history.for_phase(Phase::Val).next().unwrap().loss;
        let last = history.last(Phase::Val).unwrap().loss;
        assert!(last < first, "loss went from {} to {}", first, last);
    }

    #[test]
    fn train_model_runs_default_loop() {
        let mut out = Vec::new();
        let history = train_model(
            Box::new(linear_model()),
            &mut loaders(),
            Box::new(CrossEntropyLoss::default()),
            Box::new(SGD::new(0.001, 0.9).unwrap()),
            2,
            &mut out,
        )
        .unwrap();
        assert_eq!(history.len(), 3);
    }
}
