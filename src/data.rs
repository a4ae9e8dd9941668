//! Input generators for the coordinator's sequence.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound (exclusive) of randomly generated values.
pub const RANDOM_DATA_MULTIPLIER: f64 = 1000.0;

/// Where the coordinator's sequence comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// `n, n-1, ..., 1`: the worst case for a transposition network.
    Dummy,
    /// Uniform values in `[0, RANDOM_DATA_MULTIPLIER)`. Seeded from entropy
    /// when `seed` is `None`.
    Random { seed: Option<u64> },
}

/// Generator selection on the command line; the seed is a separate flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DataKind {
    #[default]
    Dummy,
    Random,
}

impl DataKind {
    pub fn with_seed(self, seed: Option<u64>) -> DataSource {
        match self {
            DataKind::Dummy => DataSource::Dummy,
            DataKind::Random => DataSource::Random { seed },
        }
    }
}

pub fn generate(source: DataSource, n: usize) -> Vec<f64> {
    match source {
        DataSource::Dummy => (0..n).map(|i| (n - i) as f64).collect(),
        DataSource::Random { seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            (0..n)
                .map(|_| rng.gen::<f64>() * RANDOM_DATA_MULTIPLIER)
                .collect()
        }
    }
}
