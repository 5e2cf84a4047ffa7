use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;

use loto49_db::models::{is_valid_number, MAX_NUMBER, POOL_SIZE};

use crate::weights::WeightVector;

/// Canonical key of a set of numbers in 1..=49: bit `n` set for each `n`.
pub fn combination_key(numbers: &[u8]) -> u64 {
    numbers.iter().fold(0u64, |key, &n| key | (1u64 << n))
}

fn check_mandatory(mandatory: &[u8], size: usize) {
    assert!(
        mandatory.len() <= size && size <= POOL_SIZE,
        "cannot draw {size} numbers around {} mandatory ones",
        mandatory.len()
    );
    let mut key = 0u64;
    for &n in mandatory {
        assert!(is_valid_number(n), "mandatory number {n} outside 1-{MAX_NUMBER}");
        assert!(key & (1u64 << n) == 0, "mandatory number {n} repeated");
        key |= 1u64 << n;
    }
}

/// Draws `size` distinct numbers containing `mandatory`, ascending.
///
/// Roulette-wheel selection over the numbers not yet chosen; a chosen
/// number leaves the pool. Once the pool's remaining weight is zero the
/// rest of the combination is drawn uniformly.
///
/// Panics if `mandatory` is out of range or repeated, or if `size` is
/// not in `mandatory.len()..=49`.
pub fn sample<R: Rng>(
    weights: &WeightVector,
    mandatory: &[u8],
    size: usize,
    rng: &mut R,
) -> Vec<u8> {
    check_mandatory(mandatory, size);

    let mut selected: Vec<u8> = Vec::with_capacity(size);
    selected.extend_from_slice(mandatory);
    let mut available: Vec<(u8, f64)> = weights
        .iter()
        .filter(|(n, _)| !mandatory.contains(n))
        .collect();
    let mut uniform = false;

    while selected.len() < size {
        if !uniform && available.iter().all(|(_, w)| *w <= 0.0) {
            uniform = true;
        }
        let idx = if uniform {
            rng.random_range(0..available.len())
        } else {
            let weights: Vec<f64> = available.iter().map(|(_, w)| *w).collect();
            match WeightedIndex::new(&weights) {
                Ok(dist) => dist.sample(rng),
                Err(_) => {
                    uniform = true;
                    rng.random_range(0..available.len())
                }
            }
        };

        let (number, _) = available.remove(idx);
        selected.push(number);
    }

    selected.sort_unstable();
    selected
}

/// Uniform counterpart of [`sample`] over a fixed array pool: each pick
/// swaps the chosen slot with the last live one and shrinks the pool.
pub fn sample_uniform_compact<R: Rng>(mandatory: &[u8], size: usize, rng: &mut R) -> Vec<u8> {
    check_mandatory(mandatory, size);

    let taken = combination_key(mandatory);
    let mut pool = [0u8; POOL_SIZE];
    let mut len = 0usize;
    for n in 1..=MAX_NUMBER {
        if taken & (1u64 << n) == 0 {
            pool[len] = n;
            len += 1;
        }
    }

    let mut selected: Vec<u8> = Vec::with_capacity(size);
    selected.extend_from_slice(mandatory);
    while selected.len() < size {
        let idx = rng.random_range(0..len);
        selected.push(pool[idx]);
        len -= 1;
        pool.swap(idx, len);
    }

    selected.sort_unstable();
    selected
}
