pub mod follow_on;
pub mod frequency;

use loto49_db::models::POOL_SIZE;

use crate::weights::WeightVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightTag {
    Hot,
    Cold,
    Normal,
}

impl std::fmt::Display for WeightTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeightTag::Hot => write!(f, "HOT"),
            WeightTag::Cold => write!(f, "COLD"),
            WeightTag::Normal => write!(f, "-"),
        }
    }
}

/// Tags each number by its relative deviation from the uniform weight
/// (beyond ±30 % is hot or cold).
pub fn tag_weights(weights: &WeightVector) -> Vec<(u8, f64, WeightTag)> {
    let uniform = 1.0 / POOL_SIZE as f64;
    let threshold = 0.3;

    weights
        .normalize()
        .iter()
        .map(|(number, p)| {
            let deviation = (p - uniform) / uniform;
            let tag = if deviation > threshold {
                WeightTag::Hot
            } else if deviation < -threshold {
                WeightTag::Cold
            } else {
                WeightTag::Normal
            };
            (number, p, tag)
        })
        .collect()
}
