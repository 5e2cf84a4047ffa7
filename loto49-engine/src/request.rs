use serde::{Deserialize, Serialize};

use loto49_db::models::{Combination, DOUBLE_SIZE, SINGLE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Uniform constrained sampling.
    #[default]
    Classic,
    /// Uniform sampling over a compacting pool with bitmask deduplication.
    ClassicOptimized,
    /// Weighted by transitions from draws sharing numbers with the last draw.
    FollowOn,
    /// Frequency prior times follow-on likelihood.
    Bayesian,
    /// Equal blend of uniform, follow-on and bayesian weights.
    Ensemble,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Classic,
        Method::ClassicOptimized,
        Method::FollowOn,
        Method::Bayesian,
        Method::Ensemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Classic => "classic",
            Method::ClassicOptimized => "classic-optimized",
            Method::FollowOn => "follow-on",
            Method::Bayesian => "bayesian",
            Method::Ensemble => "ensemble",
        }
    }

    /// Whether the method's weights are derived from historical draws.
    pub fn uses_history(&self) -> bool {
        matches!(self, Method::FollowOn | Method::Bayesian | Method::Ensemble)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub combination_count: u32,
    #[serde(default)]
    pub selected_numbers: Vec<u8>,
    pub lucky_number: u8,
    #[serde(default)]
    pub is_double: bool,
    #[serde(default)]
    pub method: Method,
}

impl GenerationRequest {
    pub fn required_size(&self) -> usize {
        if self.is_double {
            DOUBLE_SIZE
        } else {
            SINGLE_SIZE
        }
    }

    /// Selected numbers plus the lucky number.
    pub fn mandatory(&self) -> Vec<u8> {
        let mut out = self.selected_numbers.clone();
        out.push(self.lucky_number);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationBatch {
    pub method: Method,
    pub combinations: Vec<Combination>,
    /// Combinations kept despite colliding after every retry.
    pub duplicates_accepted: usize,
}

impl GenerationBatch {
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }
}
