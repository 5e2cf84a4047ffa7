use serde::{Deserialize, Serialize};

use loto49_db::models::{Draw, POOL_SIZE};

use crate::weights::WeightVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyMode {
    #[default]
    Hot,
    Cold,
}

/// Occurrences of each number (winning and special) over a window of draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u32; POOL_SIZE],
}

impl FrequencyTable {
    pub fn from_draws(draws: &[Draw]) -> Self {
        let mut counts = [0u32; POOL_SIZE];
        for draw in draws {
            for n in draw.combined() {
                let idx = (n as usize).wrapping_sub(1);
                if idx < POOL_SIZE {
                    counts[idx] += 1;
                }
            }
        }
        Self { counts }
    }

    pub fn count(&self, number: u8) -> u32 {
        let idx = (number as usize).wrapping_sub(1);
        self.counts.get(idx).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Raw counts as weights; all zero when no draws were counted.
    pub fn to_weights(&self) -> WeightVector {
        WeightVector::from_counts(&self.counts)
    }

    /// All 49 numbers ordered by count (descending for hot, ascending for
    /// cold), ties broken by ascending number.
    pub fn ranked(&self, mode: FrequencyMode) -> Vec<(u8, u32)> {
        let mut pairs: Vec<(u8, u32)> = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &c)| ((i + 1) as u8, c))
            .collect();
        match mode {
            FrequencyMode::Hot => pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0))),
            FrequencyMode::Cold => pairs.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0))),
        }
        pairs
    }
}

pub fn compute_frequency(draws: &[Draw], mode: FrequencyMode) -> Vec<(u8, u32)> {
    FrequencyTable::from_draws(draws).ranked(mode)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberStats {
    pub number: u8,
    pub frequency: u32,
    /// Draws since the number last appeared; the window length if never seen.
    pub gap: u32,
}

/// Frequency and gap for every number. `draws` is oldest first.
pub fn compute_stats(draws: &[Draw]) -> Vec<NumberStats> {
    let mut stats: Vec<NumberStats> = (1..=POOL_SIZE as u8)
        .map(|n| NumberStats {
            number: n,
            frequency: 0,
            gap: draws.len() as u32,
        })
        .collect();

    for (age, draw) in draws.iter().rev().enumerate() {
        for n in draw.combined() {
            let idx = (n as usize).wrapping_sub(1);
            if idx < stats.len() {
                if stats[idx].frequency == 0 {
                    stats[idx].gap = age as u32;
                }
                stats[idx].frequency += 1;
            }
        }
    }

    stats
}
