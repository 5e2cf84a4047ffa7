use loto49_db::models::Draw;

use crate::weights::WeightVector;

/// Accumulated transition counts over consecutive draws (oldest first).
///
/// For each pair `(draws[i], draws[i + 1])`, every number of `draws[i]`
/// adds one to the weight of every number of `draws[i + 1]`. Fewer than
/// two draws gives an all-zero vector.
pub fn compute_follow_on_weights(draws: &[Draw]) -> WeightVector {
    accumulate(draws, None, 1.0)
}

/// Transition counts restricted to source numbers also present in
/// `reference`, so draws sharing numbers with it dominate. Falls back to
/// the unconditioned counts when no transition qualifies.
pub fn follow_on_weights_for(draws: &[Draw], reference: &Draw) -> WeightVector {
    follow_on_weights_with_decay(draws, Some(reference), 1.0)
}

/// Same as [`follow_on_weights_for`] (or the unconditioned counts when
/// `reference` is `None`), with the transition ending at the latest draw
/// weighted 1 and each older one multiplied by a further `decay`.
pub fn follow_on_weights_with_decay(
    draws: &[Draw],
    reference: Option<&Draw>,
    decay: f64,
) -> WeightVector {
    if let Some(reference) = reference {
        let conditioned = accumulate(draws, Some(reference), decay);
        if !conditioned.is_degenerate() {
            return conditioned;
        }
    }
    accumulate(draws, None, decay)
}

fn accumulate(draws: &[Draw], reference: Option<&Draw>, decay: f64) -> WeightVector {
    let mut weights = WeightVector::zeros();
    if draws.len() < 2 {
        return weights;
    }

    let n_pairs = draws.len() - 1;
    for (i, pair) in draws.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        let sources = match reference {
            Some(r) => from.combined().iter().filter(|&&n| r.contains(n)).count(),
            None => from.combined().len(),
        };
        if sources == 0 {
            continue;
        }
        let age = (n_pairs - 1 - i) as i32;
        let increment = sources as f64 * decay.powi(age);
        for n in to.combined() {
            weights.add(n, increment);
        }
    }

    weights
}
