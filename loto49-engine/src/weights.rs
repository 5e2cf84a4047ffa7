use loto49_db::models::{MAX_NUMBER, POOL_SIZE};

use crate::error::WeightError;

const MIX_TOLERANCE: f64 = 1e-9;

/// Non-negative sampling weight per number, indexed 1..=49.
///
/// An all-zero vector is the degenerate form produced by analyzers with
/// too little history; [`WeightVector::normalize`] turns it into uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector([f64; POOL_SIZE]);

impl WeightVector {
    pub fn zeros() -> Self {
        Self([0.0; POOL_SIZE])
    }

    pub fn uniform() -> Self {
        Self([1.0 / POOL_SIZE as f64; POOL_SIZE])
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, WeightError> {
        if values.len() != POOL_SIZE {
            return Err(WeightError::Length { expected: POOL_SIZE, actual: values.len() });
        }
        let mut weights = [0.0; POOL_SIZE];
        for (i, &value) in values.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightError::InvalidEntry { number: (i + 1) as u8, value });
            }
            weights[i] = value;
        }
        Ok(Self(weights))
    }

    pub fn from_counts(counts: &[u32; POOL_SIZE]) -> Self {
        let mut weights = [0.0; POOL_SIZE];
        for (w, &c) in weights.iter_mut().zip(counts.iter()) {
            *w = c as f64;
        }
        Self(weights)
    }

    /// Weight of `number`. Panics if `number` is outside 1..=49.
    pub fn get(&self, number: u8) -> f64 {
        assert!((1..=MAX_NUMBER).contains(&number), "number {number} outside 1-{MAX_NUMBER}");
        self.0[(number - 1) as usize]
    }

    pub(crate) fn add(&mut self, number: u8, amount: f64) {
        let idx = (number as usize).wrapping_sub(1);
        if idx < POOL_SIZE {
            self.0[idx] += amount;
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// `(number, weight)` pairs in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.0.iter().enumerate().map(|(i, &w)| ((i + 1) as u8, w))
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_degenerate(&self) -> bool {
        self.sum() <= 0.0
    }

    /// Scales to sum 1. A degenerate vector becomes uniform.
    pub fn normalize(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 {
            return Self::uniform();
        }
        let mut out = self.0;
        for w in &mut out {
            *w /= total;
        }
        Self(out)
    }
}

impl Default for WeightVector {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Convex combination `Σ mix_i · normalize(v_i)`.
pub fn blend(parts: &[(&WeightVector, f64)]) -> Result<WeightVector, WeightError> {
    let mix_total: f64 = parts.iter().map(|(_, m)| *m).sum();
    if parts.iter().any(|(_, m)| *m < 0.0 || !m.is_finite())
        || (mix_total - 1.0).abs() > MIX_TOLERANCE
    {
        return Err(WeightError::MixNotConvex(mix_total));
    }

    let mut combined = [0.0f64; POOL_SIZE];
    for (vector, mix) in parts {
        let normalized = vector.normalize();
        for (c, w) in combined.iter_mut().zip(normalized.0.iter()) {
            *c += mix * w;
        }
    }
    Ok(WeightVector(combined))
}

/// Elementwise product of the normalized prior and likelihood, normalized.
/// Falls back to the normalized prior when the product is all zero.
pub fn posterior(prior: &WeightVector, likelihood: &WeightVector) -> WeightVector {
    let prior = prior.normalize();
    let likelihood = likelihood.normalize();

    let mut product = [0.0f64; POOL_SIZE];
    for (i, p) in product.iter_mut().enumerate() {
        *p = prior.0[i] * likelihood.0[i];
    }
    let product = WeightVector(product);
    if product.is_degenerate() {
        return prior;
    }
    product.normalize()
}

/// True when `dist` has 49 non-negative entries summing to 1.
#[cfg(test)]
pub(crate) fn validate_distribution(dist: &WeightVector) -> bool {
    if dist.0.iter().any(|&p| p < 0.0 || !p.is_finite()) {
        return false;
    }
    (dist.sum() - 1.0).abs() < 1e-9
}
