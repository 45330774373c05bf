use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xxhash_rust::xxh3::xxh3_64;

/// Decides which discovered articles are processed now and which are saved
/// for later.
pub trait Sampler {
    fn select(&mut self, index: u64) -> bool;
}

/// Reseeds a `StdRng` for every article index, so the same listing walk
/// always selects the same articles.
#[derive(Debug, Clone)]
pub struct SeededSampler {
    seed: u64,
    rate: f64,
}

impl SeededSampler {
    pub fn new(seed: u64, rate: f64) -> Self {
        Self { seed, rate }
    }

    /// Base seed derived from the listing subject, e.g. `mathematics-and-computing`
    pub fn for_subject(subject: &str, rate: f64) -> Self {
        Self::new(subject_seed(subject), rate)
    }
}

impl Sampler for SeededSampler {
    fn select(&mut self, index: u64) -> bool {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index));
        rng.gen::<f64>() < self.rate
    }
}

pub fn subject_seed(subject: &str) -> u64 {
    xxh3_64(subject.as_bytes())
}
