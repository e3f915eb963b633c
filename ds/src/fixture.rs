//! Input arrays for a run

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// `0, 1, ..., n - 1`
pub fn sequence(n: usize) -> Vec<u64> {
    (0..n as u64).collect()
}

/// Permute `array` in place with one random swap per index
///
/// Each index is swapped with one drawn from `0..len - 1`. A seed makes the
/// permutation reproducible; arrays shorter than two are left alone.
pub fn shuffle(array: &mut [u64], seed: Option<u64>) {
    debug!(len = array.len(), ?seed, "shuffle: called");
    let len = array.len();
    if len < 2 {
        return;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    for i in 0..len {
        let j = rng.random_range(0..len - 1);
        array.swap(i, j);
    }
}

/// Shuffled `0..n`, the array every run starts from
pub fn shuffled_sequence(n: usize, seed: Option<u64>) -> Vec<u64> {
    let mut array = sequence(n);
    shuffle(&mut array, seed);
    array
}
