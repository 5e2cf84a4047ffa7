//! Strategy dispatch and batch assembly.
//!
//! Every method maps to a [`Strategy`]: either a weight vector fed to the
//! roulette-wheel sampler, or the compact uniform sampler. Requests are
//! validated, and reference draws checked, before any sampling happens;
//! once sampling starts the batch is always completed.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use loto49_db::models::{Combination, Draw};

use crate::analysis::follow_on::follow_on_weights_with_decay;
use crate::analysis::frequency::FrequencyTable;
use crate::config::GeneratorConfig;
use crate::constraints::validate;
use crate::error::GenerateError;
use crate::request::{GenerationBatch, GenerationRequest, Method};
use crate::sampler::{combination_key, sample, sample_uniform_compact};
use crate::weights::{blend, posterior, WeightVector};

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Weighted(WeightVector),
    UniformCompact,
}

impl Strategy {
    fn draw<R: Rng>(&self, mandatory: &[u8], size: usize, rng: &mut R) -> Vec<u8> {
        match self {
            Strategy::Weighted(weights) => sample(weights, mandatory, size, rng),
            Strategy::UniformCompact => sample_uniform_compact(mandatory, size, rng),
        }
    }
}

/// Keys of the combinations already in a batch.
enum SeenKeys {
    Sorted(HashSet<Vec<u8>>),
    Bitmask(HashSet<u64>),
}

impl SeenKeys {
    fn for_method(method: Method) -> Self {
        match method {
            Method::ClassicOptimized => SeenKeys::Bitmask(HashSet::new()),
            _ => SeenKeys::Sorted(HashSet::new()),
        }
    }

    fn contains(&self, numbers: &[u8]) -> bool {
        match self {
            SeenKeys::Sorted(set) => set.contains(numbers),
            SeenKeys::Bitmask(set) => set.contains(&combination_key(numbers)),
        }
    }

    /// Returns false if the key was already present.
    fn insert(&mut self, numbers: &[u8]) -> bool {
        match self {
            SeenKeys::Sorted(set) => set.insert(numbers.to_vec()),
            SeenKeys::Bitmask(set) => set.insert(combination_key(numbers)),
        }
    }
}

/// Follow-on transition weights, conditioned on `last_draw` when present.
pub fn follow_on_component(
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
) -> WeightVector {
    follow_on_weights_with_decay(history, last_draw, config.follow_on_decay).normalize()
}

/// Hot-frequency prior times the follow-on likelihood (uniform without a
/// reference draw).
pub fn bayesian_weights(
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
) -> WeightVector {
    let prior = FrequencyTable::from_draws(history).to_weights().normalize();
    let likelihood = match last_draw {
        Some(_) => follow_on_component(history, last_draw, config),
        None => WeightVector::uniform(),
    };
    posterior(&prior, &likelihood)
}

pub fn ensemble_weights(
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
) -> Result<WeightVector, GenerateError> {
    let uniform = WeightVector::uniform();
    let bayesian = bayesian_weights(history, last_draw, config);
    let blended = match last_draw {
        Some(_) => {
            let follow_on = follow_on_component(history, last_draw, config);
            blend(&[(&uniform, 1.0 / 3.0), (&follow_on, 1.0 / 3.0), (&bayesian, 1.0 / 3.0)])?
        }
        None => blend(&[(&uniform, 0.5), (&bayesian, 0.5)])?,
    };
    Ok(blended)
}

/// The normalized weight vector `method` samples from.
pub fn strategy_weights(
    method: Method,
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
) -> Result<WeightVector, GenerateError> {
    match method {
        Method::Classic | Method::ClassicOptimized => Ok(WeightVector::uniform()),
        Method::FollowOn => {
            let reference = last_draw.ok_or(GenerateError::MissingReferenceDraw)?;
            Ok(follow_on_component(history, Some(reference), config))
        }
        Method::Bayesian => Ok(bayesian_weights(history, last_draw, config)),
        Method::Ensemble => ensemble_weights(history, last_draw, config),
    }
}

fn check_history(
    method: Method,
    history: &[Draw],
    config: &GeneratorConfig,
) -> Result<(), GenerateError> {
    if method.uses_history() && history.len() < config.min_history {
        if config.strict_history {
            return Err(GenerateError::InsufficientHistory {
                available: history.len(),
                required: config.min_history,
            });
        }
        warn!(
            method = %method,
            available = history.len(),
            required = config.min_history,
            "insufficient history, weights degrade toward uniform"
        );
    }
    Ok(())
}

struct Plan {
    strategy: Strategy,
    mandatory: Vec<u8>,
    size: usize,
    count: usize,
}

/// Every check that can fail, run before any sampling.
fn prepare(
    request: &GenerationRequest,
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
) -> Result<Plan, GenerateError> {
    validate(request)?;
    config.validate()?;
    if request.method == Method::FollowOn && last_draw.is_none() {
        return Err(GenerateError::MissingReferenceDraw);
    }
    check_history(request.method, history, config)?;

    let strategy = match request.method {
        Method::ClassicOptimized => Strategy::UniformCompact,
        method => Strategy::Weighted(strategy_weights(method, history, last_draw, config)?),
    };

    debug!(
        method = %request.method,
        count = request.combination_count,
        history = history.len(),
        has_reference = last_draw.is_some(),
        "generating batch"
    );

    Ok(Plan {
        strategy,
        mandatory: request.mandatory(),
        size: request.required_size(),
        count: request.combination_count as usize,
    })
}

/// Resamples `numbers` while it collides with the batch, up to the retry
/// bound, then records it. Returns true if a duplicate had to be kept.
fn admit<R: Rng>(
    mut numbers: Vec<u8>,
    plan: &Plan,
    seen: &mut SeenKeys,
    max_retries: usize,
    rng: &mut R,
) -> (Vec<u8>, bool) {
    let mut attempts = 0;
    while seen.contains(&numbers) && attempts < max_retries {
        numbers = plan.strategy.draw(&plan.mandatory, plan.size, rng);
        attempts += 1;
    }
    let duplicate = !seen.insert(&numbers);
    (numbers, duplicate)
}

fn finish(method: Method, combinations: Vec<Combination>, duplicates_accepted: usize) -> GenerationBatch {
    if duplicates_accepted > 0 {
        warn!(
            method = %method,
            duplicates = duplicates_accepted,
            "kept duplicate combinations after exhausting retries"
        );
    }
    GenerationBatch {
        method,
        combinations,
        duplicates_accepted,
    }
}

/// Generates a batch sequentially from `rng`.
///
/// `history` is oldest first; `last_draw` is the reference draw for the
/// follow-on family of methods.
pub fn generate<R: Rng>(
    request: &GenerationRequest,
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<GenerationBatch, GenerateError> {
    let plan = prepare(request, history, last_draw, config)?;
    let mut seen = SeenKeys::for_method(request.method);
    let mut combinations = Vec::with_capacity(plan.count);
    let mut duplicates = 0usize;

    for i in 0..plan.count {
        let first = plan.strategy.draw(&plan.mandatory, plan.size, rng);
        let (numbers, duplicate) = admit(first, &plan, &mut seen, config.max_retries, rng);
        if duplicate {
            duplicates += 1;
        }
        combinations.push(Combination {
            sequence_number: (i + 1) as u32,
            numbers,
        });
    }

    Ok(finish(request.method, combinations, duplicates))
}

/// Seed of combination `index` in a parallel batch. The index is spread
/// over the whole word so batches with neighbouring seeds share no stream.
fn combination_seed(seed: u64, index: u64) -> u64 {
    seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Parallel variant of [`generate`]: first attempts are drawn on the rayon
/// pool with one `StdRng` per combination derived from `seed`, then merged
/// in order with the same retry rule. Same seed, same batch.
pub fn generate_parallel(
    request: &GenerationRequest,
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
    seed: u64,
) -> Result<GenerationBatch, GenerateError> {
    let plan = prepare(request, history, last_draw, config)?;

    let firsts: Vec<(StdRng, Vec<u8>)> = (0..plan.count)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(combination_seed(seed, i as u64));
            let numbers = plan.strategy.draw(&plan.mandatory, plan.size, &mut rng);
            (rng, numbers)
        })
        .collect();

    let mut seen = SeenKeys::for_method(request.method);
    let mut combinations = Vec::with_capacity(plan.count);
    let mut duplicates = 0usize;

    for (i, (mut rng, first)) in firsts.into_iter().enumerate() {
        let (numbers, duplicate) = admit(first, &plan, &mut seen, config.max_retries, &mut rng);
        if duplicate {
            duplicates += 1;
        }
        combinations.push(Combination {
            sequence_number: (i + 1) as u32,
            numbers,
        });
    }

    Ok(finish(request.method, combinations, duplicates))
}

/// Entry point for callers holding an optional seed: picks sequential or
/// parallel assembly from `config.parallel`, seeding from OS entropy when
/// `seed` is `None`.
pub fn generate_seeded(
    request: &GenerationRequest,
    history: &[Draw],
    last_draw: Option<&Draw>,
    config: &GeneratorConfig,
    seed: Option<u64>,
) -> Result<GenerationBatch, GenerateError> {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    if config.parallel {
        generate_parallel(request, history, last_draw, config, seed)
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        generate(request, history, last_draw, config, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstraintViolation;
    use crate::test_support::{disjoint_history, draw};
    use crate::weights::validate_distribution;

    fn request(method: Method, count: u32, selected: &[u8], lucky: u8, is_double: bool) -> GenerationRequest {
        GenerationRequest {
            combination_count: count,
            selected_numbers: selected.to_vec(),
            lucky_number: lucky,
            is_double,
            method,
        }
    }

    fn check_batch(batch: &GenerationBatch, req: &GenerationRequest) {
        assert_eq!(batch.len(), req.combination_count as usize);
        let mandatory = req.mandatory();
        for (i, combo) in batch.combinations.iter().enumerate() {
            assert_eq!(combo.sequence_number, (i + 1) as u32);
            assert_eq!(combo.numbers.len(), req.required_size(), "{:?}", combo.numbers);
            assert!(combo.numbers.windows(2).all(|w| w[0] < w[1]), "{:?}", combo.numbers);
            assert!(combo.numbers.iter().all(|&n| (1..=49).contains(&n)));
            assert!(combo.contains_all(&mandatory), "{:?} misses {:?}", combo.numbers, mandatory);
        }
    }

    #[test]
    fn test_classic_scenario() {
        let history = disjoint_history(10);
        let req = request(Method::Classic, 5, &[7], 42, false);
        let mut rng = StdRng::seed_from_u64(42);
        let batch = generate(&req, &history, None, &GeneratorConfig::default(), &mut rng).unwrap();
        check_batch(&batch, &req);
        assert_eq!(batch.method, Method::Classic);
        assert_eq!(batch.duplicates_accepted, 0);
    }

    #[test]
    fn test_all_methods_fill_batch() {
        let history = disjoint_history(30);
        let last = history.last().cloned();
        for method in Method::ALL {
            for is_double in [false, true] {
                let req = request(method, 10, &[3, 14], 29, is_double);
                let mut rng = StdRng::seed_from_u64(7);
                let batch =
                    generate(&req, &history, last.as_ref(), &GeneratorConfig::default(), &mut rng)
                        .unwrap();
                check_batch(&batch, &req);
                assert_eq!(batch.duplicates_accepted, 0, "{method}");
            }
        }
    }

    #[test]
    fn test_follow_on_without_reference_fails() {
        let history = disjoint_history(10);
        let req = request(Method::FollowOn, 5, &[], 42, false);
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate(&req, &history, None, &GeneratorConfig::default(), &mut rng).unwrap_err();
        assert_eq!(err, GenerateError::MissingReferenceDraw);
    }

    #[test]
    fn test_validation_precedes_reference_check() {
        let req = request(Method::FollowOn, 0, &[], 50, false);
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate(&req, &[], None, &GeneratorConfig::default(), &mut rng).unwrap_err();
        assert_eq!(err, GenerateError::InvalidConstraint(ConstraintViolation::CombinationCount));
    }

    #[test]
    fn test_methods_without_history_degrade() {
        let last = draw(0, [1, 2, 3, 4, 5, 6], 7);
        for method in Method::ALL {
            let req = request(method, 3, &[], 10, false);
            let mut rng = StdRng::seed_from_u64(3);
            let batch = generate(&req, &[], Some(&last), &GeneratorConfig::default(), &mut rng).unwrap();
            check_batch(&batch, &req);
        }
    }

    #[test]
    fn test_strict_history() {
        let config = GeneratorConfig { strict_history: true, min_history: 5, ..Default::default() };
        let history = disjoint_history(3);
        let mut rng = StdRng::seed_from_u64(3);

        let req = request(Method::Bayesian, 3, &[], 10, false);
        let err = generate(&req, &history, None, &config, &mut rng).unwrap_err();
        assert_eq!(err, GenerateError::InsufficientHistory { available: 3, required: 5 });

        // classic ignores history entirely
        let req = request(Method::Classic, 3, &[], 10, false);
        assert!(generate(&req, &history, None, &config, &mut rng).is_ok());
    }

    #[test]
    fn test_exhausted_pool_accepts_duplicates() {
        // 5 selected + lucky fill a single combination: only one possible outcome
        let req = request(Method::Classic, 3, &[1, 2, 3, 4, 5], 6, false);
        let mut rng = StdRng::seed_from_u64(5);
        let batch = generate(&req, &[], None, &GeneratorConfig::default(), &mut rng).unwrap();
        check_batch(&batch, &req);
        assert_eq!(batch.duplicates_accepted, 2);
        for combo in &batch.combinations {
            assert_eq!(combo.numbers, vec![1, 2, 3, 4, 5, 6]);
        }
    }

    #[test]
    fn test_small_pool_deduplicates() {
        // 43 possible double combinations around 6 mandatory numbers
        for method in [Method::Classic, Method::ClassicOptimized] {
            let req = request(method, 10, &[10, 20, 30, 40, 45], 1, true);
            let mut rng = StdRng::seed_from_u64(17);
            let batch = generate(&req, &[], None, &GeneratorConfig::default(), &mut rng).unwrap();
            check_batch(&batch, &req);
            let keys: HashSet<u64> =
                batch.combinations.iter().map(|c| combination_key(&c.numbers)).collect();
            assert_eq!(keys.len(), 10, "{method}");
        }
    }

    #[test]
    fn test_seed_determinism() {
        let history = disjoint_history(12);
        let last = history.last().cloned();
        let req = request(Method::Ensemble, 8, &[5], 11, false);
        let config = GeneratorConfig::default();

        let a = generate_seeded(&req, &history, last.as_ref(), &config, Some(99)).unwrap();
        let b = generate_seeded(&req, &history, last.as_ref(), &config, Some(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_neighbouring_seeds_do_not_overlap() {
        for i in 0..64u64 {
            assert_ne!(combination_seed(2, i), combination_seed(1, i + 1));
        }

        let config = GeneratorConfig::default();
        let req = request(Method::Classic, 10, &[], 49, false);
        let a = generate_parallel(&req, &[], None, &config, 1).unwrap();
        let b = generate_parallel(&req, &[], None, &config, 2).unwrap();
        let shifted = a.combinations[1..]
            .iter()
            .zip(&b.combinations)
            .filter(|(x, y)| x.numbers == y.numbers)
            .count();
        assert_eq!(shifted, 0);
    }

    #[test]
    fn test_parallel_batch() {
        let history = disjoint_history(12);
        let last = history.last().cloned();
        let config = GeneratorConfig { parallel: true, ..Default::default() };
        for method in Method::ALL {
            let req = request(method, 10, &[2], 48, false);
            let a = generate_parallel(&req, &history, last.as_ref(), &config, 2024).unwrap();
            let b = generate_seeded(&req, &history, last.as_ref(), &config, Some(2024)).unwrap();
            check_batch(&a, &req);
            assert_eq!(a, b, "{method}");
            assert_eq!(a.duplicates_accepted, 0);
        }
    }

    #[test]
    fn test_strategy_weights_are_distributions() {
        let history = disjoint_history(20);
        let last = history.last().cloned();
        let config = GeneratorConfig::default();
        for method in Method::ALL {
            let w = strategy_weights(method, &history, last.as_ref(), &config).unwrap();
            assert!(validate_distribution(&w), "{method}: sum = {}", w.sum());
        }
    }

    #[test]
    fn test_follow_on_weights_concentrate_on_successors() {
        // 1 is always followed by 20..=26
        let history = vec![
            draw(0, [1, 2, 3, 4, 5, 6], 7),
            draw(1, [20, 21, 22, 23, 24, 25], 26),
            draw(2, [1, 8, 9, 10, 11, 12], 13),
            draw(3, [20, 21, 22, 23, 24, 25], 26),
        ];
        let last = draw(4, [1, 30, 31, 32, 33, 34], 35);
        let w = strategy_weights(Method::FollowOn, &history, Some(&last), &GeneratorConfig::default())
            .unwrap();
        for n in 20..=26u8 {
            assert!((w.get(n) - 1.0 / 7.0).abs() < 1e-12, "{n}: {}", w.get(n));
        }
        assert_eq!(w.get(1), 0.0);

        let req = request(Method::FollowOn, 4, &[], 20, false);
        let mut rng = StdRng::seed_from_u64(8);
        let batch = generate(&req, &history, Some(&last), &GeneratorConfig::default(), &mut rng).unwrap();
        for combo in &batch.combinations {
            assert!(combo.numbers.iter().all(|n| (20..=26).contains(n)), "{:?}", combo.numbers);
        }
    }

    #[test]
    fn test_bayesian_without_reference_is_frequency_prior() {
        let history = vec![
            draw(0, [1, 2, 3, 4, 5, 6], 7),
            draw(1, [1, 2, 3, 8, 9, 10], 11),
        ];
        let w = strategy_weights(Method::Bayesian, &history, None, &GeneratorConfig::default()).unwrap();
        assert!((w.get(1) - 2.0 / 14.0).abs() < 1e-12);
        assert!((w.get(11) - 1.0 / 14.0).abs() < 1e-12);
        assert_eq!(w.get(49), 0.0);
    }

    #[test]
    fn test_ensemble_keeps_uniform_floor() {
        let history = disjoint_history(8);
        let last = history.last().cloned();
        let config = GeneratorConfig::default();

        let with_ref = strategy_weights(Method::Ensemble, &history, last.as_ref(), &config).unwrap();
        let without_ref = strategy_weights(Method::Ensemble, &history, None, &config).unwrap();
        for n in 1..=49u8 {
            assert!(with_ref.get(n) >= 1.0 / 3.0 / 49.0 - 1e-12);
            assert!(without_ref.get(n) >= 0.5 / 49.0 - 1e-12);
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_sampling() {
        let config = GeneratorConfig { follow_on_decay: 0.0, ..Default::default() };
        let req = request(Method::Classic, 1, &[], 1, false);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            generate(&req, &[], None, &config, &mut rng),
            Err(GenerateError::InvalidConfig(_))
        ));
    }
}
