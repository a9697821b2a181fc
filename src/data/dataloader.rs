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

use crate::core::{
    error::TrainingError,
    random::{derive_seed, rng_for, Stream},
    tensor::Tensor,
};
use crate::data::{
    dataset::Dataset,
    sampler::{RandomSampler, Sampler, SequentialSampler},
};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::sync::Arc;

/// One collated mini-batch: inputs `[B, ...]` and one class index per sample.
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Tensor,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// What the trainer needs from a data pipeline: batches in a stable order
/// for a fixed seed, and the size of the underlying dataset.
pub trait BatchSource {
    fn dataset_len(&self) -> usize;

    /// Number of batches one pass yields.
    fn num_batches(&self) -> usize;

    /// Starts a new pass over the data.
    fn batches(&mut self) -> Box<dyn Iterator<Item = Result<Batch, TrainingError>> + '_>;
}

pub struct DataLoader {
    dataset: Arc<dyn Dataset>,
    sampler: Box<dyn Sampler>,
    batch_size: usize,
    drop_last: bool,
    pool: Option<Arc<ThreadPool>>,
    seed: u64,
    epoch: u64,
}

impl DataLoader {
    pub fn new(
        dataset: Arc<dyn Dataset>,
        batch_size: usize,
        shuffle: bool,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        if batch_size == 0 {
            return Err(TrainingError::InvalidParameter(
                "batch size must be greater than 0".into(),
            ));
        }

        let sampler: Box<dyn Sampler> = if shuffle {
            Box::new(RandomSampler::new(dataset.len()))
        } else {
            Box::new(SequentialSampler::new(dataset.len()))
        };

        Ok(DataLoader {
            dataset,
            sampler,
            batch_size,
            drop_last: false,
            pool: None,
            seed,
            epoch: 0,
        })
    }

    /// Decodes the samples of a batch on `num_workers` threads.
    pub fn with_num_workers(mut self, num_workers: usize) -> Result<Self, TrainingError> {
        self.pool = if num_workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .build()
                .map_err(|e| {
                    TrainingError::InvalidConfiguration(format!("worker pool: {}", e))
                })?;
            Some(Arc::new(pool))
        } else {
            None
        };
        Ok(self)
    }

    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn dataset(&self) -> &Arc<dyn Dataset> {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        let len = self.dataset.len();
        if self.drop_last {
            len / self.batch_size
        } else {
            (len + self.batch_size - 1) / self.batch_size
        }
    }

    pub fn iter(&mut self) -> DataLoaderIterator<'_> {
        let epoch_seed = derive_seed(self.seed, self.epoch);
        self.epoch += 1;

        let order = self
            .sampler
            .epoch_indices(&mut rng_for(epoch_seed, Stream::Shuffle));
        let mut augmentation_rng = rng_for(epoch_seed, Stream::Augmentation);
        let sample_seeds = order
            .iter()
            .map(|_| augmentation_rng.gen::<u64>())
            .collect();

        DataLoaderIterator {
            dataloader: self,
            order,
            sample_seeds,
            position: 0,
        }
    }
}

impl BatchSource for DataLoader {
    fn dataset_len(&self) -> usize {
        self.dataset.len()
    }

    fn num_batches(&self) -> usize {
        DataLoader::num_batches(self)
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = Result<Batch, TrainingError>> + '_> {
        Box::new(self.iter())
    }
}

pub struct DataLoaderIterator<'a> {
    dataloader: &'a DataLoader,
    order: Vec<usize>,
    sample_seeds: Vec<u64>,
    position: usize,
}

impl<'a> DataLoaderIterator<'a> {
    fn load(&self, start: usize, end: usize) -> Result<Vec<(Tensor, usize)>, TrainingError> {
        let dataset = self.dataloader.dataset.as_ref();
        let work: Vec<(usize, u64)> = self.order[start..end]
            .iter()
            .copied()
            .zip(self.sample_seeds[start..end].iter().copied())
            .collect();

        let load_one = |&(index, seed): &(usize, u64)| {
            let mut rng = StdRng::seed_from_u64(seed);
            dataset.get(index, &mut rng)
        };

        match &self.dataloader.pool {
            Some(pool) => pool.install(|| work.par_iter().map(load_one).collect()),
            None => work.iter().map(load_one).collect(),
        }
    }
}

impl<'a> Iterator for DataLoaderIterator<'a> {
    type Item = Result<Batch, TrainingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.order.len();
        if self.position >= total {
            return None;
        }

        let start = self.position;
        let end = (start + self.dataloader.batch_size).min(total);
        if self.dataloader.drop_last && end - start < self.dataloader.batch_size {
            self.position = total;
            return None;
        }
        self.position = end;

        debug!("Loading batch of samples {}..{} of {}", start, end, total);
        Some(self.load(start, end).and_then(collate_batch))
    }
}

fn collate_batch(batch: Vec<(Tensor, usize)>) -> Result<Batch, TrainingError> {
    let (inputs, labels): (Vec<Tensor>, Vec<usize>) = batch.into_iter().unzip();
    Ok(Batch {
        inputs: Tensor::stack(&inputs)?,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    /// Element i is the scalar `[i + noise]`; label is `i % 2`.
    struct CountingDataset {
        len: usize,
        noisy: bool,
    }

    impl Dataset for CountingDataset {
        fn len(&self) -> usize {
            self.len
        }

        fn get(
            &self,
            index: usize,
            rng: &mut dyn RngCore,
        ) -> Result<(Tensor, usize), TrainingError> {
            let noise = if self.noisy { rng.gen::<f32>() * 0.1 } else { 0.0 };
            Ok((Tensor::new(vec![index as f32 + noise], vec![1])?, index % 2))
        }
    }

    fn loader(len: usize, batch_size: usize, shuffle: bool, seed: u64) -> DataLoader {
        DataLoader::new(
            Arc::new(CountingDataset { len, noisy: true }),
            batch_size,
            shuffle,
            seed,
        )
        .unwrap()
    }

    fn epoch_indices(loader: &mut DataLoader) -> Vec<Vec<usize>> {
        loader
            .iter()
            .map(|b| {
                b.unwrap()
                    .inputs
                    .data()
                    .iter()
                    .map(|v| v.floor() as usize)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn sequential_batches_keep_short_tail() {
        let mut dl = loader(5, 2, false, 0);
        assert_eq!(epoch_indices(&mut dl), vec![vec![0, 1], vec![2, 3], vec![4]]);
        assert_eq!(dl.dataset_len(), 5);
        assert_eq!(dl.num_batches(), 3);
    }

    #[test]
    fn drop_last_discards_short_tail() {
        let mut dl = loader(5, 2, false, 0).with_drop_last(true);
        assert_eq!(epoch_indices(&mut dl), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(dl.num_batches(), 2);
    }

    #[test]
    fn shuffle_is_reproducible_and_complete() {
        let mut a = loader(20, 3, true, 1234);
        let mut b = loader(20, 3, true, 1234);
        let first = epoch_indices(&mut a);
        assert_eq!(first, epoch_indices(&mut b));

        let mut seen: Vec<usize> = first.concat();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());

        // a new epoch reshuffles
        assert_ne!(first, epoch_indices(&mut a));
    }

    #[test]
    fn workers_do_not_change_results() {
        let mut single = loader(9, 4, true, 77);
        let mut pooled = loader(9, 4, true, 77).with_num_workers(3).unwrap();
        let a: Vec<Vec<f32>> = single.iter().map(|b| b.unwrap().inputs.data).collect();
        let b: Vec<Vec<f32>> = pooled.iter().map(|b| b.unwrap().inputs.data).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn batches_carry_labels_and_shape() {
        let mut dl = DataLoader::new(
            Arc::new(CountingDataset { len: 3, noisy: false }),
            3,
            false,
            0,
        )
        .unwrap();
        let batch = dl.batches().next().unwrap().unwrap();
        assert_eq!(batch.inputs.shape(), &[3, 1]);
        assert_eq!(batch.labels, vec![0, 1, 0]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let dataset = Arc::new(CountingDataset { len: 3, noisy: false });
        assert!(DataLoader::new(dataset, 0, false, 0).is_err());
    }
}
