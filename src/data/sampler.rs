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

use rand::seq::SliceRandom;
use rand::RngCore;

/// Produces the order in which one epoch visits dataset indices.
pub trait Sampler: Send + Sync {
    fn epoch_indices(&self, rng: &mut dyn RngCore) -> Vec<usize>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RandomSampler {
    data_len: usize,
}

impl RandomSampler {
    pub fn new(data_len: usize) -> Self {
        RandomSampler { data_len }
    }
}

impl Sampler for RandomSampler {
    fn epoch_indices(&self, rng: &mut dyn RngCore) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.data_len).collect();
        indices.shuffle(rng);
        indices
    }

    fn len(&self) -> usize {
        self.data_len
    }
}

pub struct SequentialSampler {
    data_len: usize,
}

impl SequentialSampler {
    pub fn new(data_len: usize) -> Self {
        SequentialSampler { data_len }
    }
}

impl Sampler for SequentialSampler {
    fn epoch_indices(&self, _rng: &mut dyn RngCore) -> Vec<usize> {
        (0..self.data_len).collect()
    }

    fn len(&self) -> usize {
        self.data_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_sampler_is_a_seeded_permutation() {
        let sampler = RandomSampler::new(50);
        let a = sampler.epoch_indices(&mut StdRng::seed_from_u64(9));
        let b = sampler.epoch_indices(&mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn sequential_sampler_keeps_order() {
        let sampler = SequentialSampler::new(4);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sampler.epoch_indices(&mut rng), vec![0, 1, 2, 3]);
        assert!(SequentialSampler::new(0).is_empty());
    }
}
