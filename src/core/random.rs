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
use rand::prelude::*;
use rand_distr::Normal;

/// Independent random streams derived from the single configured seed.
///
/// Every component that needs randomness receives its own `StdRng` built
/// from `(seed, stream)`; nothing reads process-wide random state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    WeightInit,
    Dropout,
    Shuffle,
    Augmentation,
}

impl Stream {
    fn id(self) -> u64 {
        match self {
            Stream::WeightInit => 1,
            Stream::Dropout => 2,
            Stream::Shuffle => 3,
            Stream::Augmentation => 4,
        }
    }
}

/// SplitMix64 finalizer over `seed` and `salt`.
pub fn derive_seed(seed: u64, salt: u64) -> u64 {
    let mut z = seed ^ salt.wrapping_add(0x9E37_79B9_7F4A_7C15).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn rng_for(seed: u64, stream: Stream) -> StdRng {
    StdRng::seed_from_u64(derive_seed(seed, stream.id()))
}

pub fn normal<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f32,
    std: f32,
    size: usize,
) -> Result<Vec<f32>, TrainingError> {
    if !(std >= 0.0) {
        return Err(TrainingError::InvalidParameter(format!(
            "normal distribution std must be non-negative, got {}",
            std
        )));
    }
    let normal = Normal::new(mean, std).map_err(|e| {
        TrainingError::InvalidParameter(format!("normal distribution (std {}): {}", std, e))
    })?;
    Ok((0..size).map(|_| normal.sample(rng)).collect())
}

/// `true` with probability `p` for each of `size` draws.
pub fn bernoulli<R: Rng + ?Sized>(rng: &mut R, p: f32, size: usize) -> Vec<bool> {
    (0..size).map(|_| rng.gen::<f32>() < p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_reproducible_and_distinct() {
        let a: u64 = rng_for(1234, Stream::Shuffle).gen();
        let b: u64 = rng_for(1234, Stream::Shuffle).gen();
        let c: u64 = rng_for(1234, Stream::Dropout).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn normal_rejects_negative_std() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(normal(&mut rng, 0.0, -1.0, 4).is_err());
        assert_eq!(normal(&mut rng, 0.0, 1.0, 4).unwrap().len(), 4);
    }
}
