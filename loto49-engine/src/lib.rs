//! Combination generation and historical analysis for 6/49 draws.
//!
//! History flows one way: draws → analyzers → weight vectors → sampler →
//! combinations. Nothing here keeps state between calls; history, the
//! reference draw and the random source are all passed in.

pub mod analysis;
pub mod config;
pub mod constraints;
pub mod error;
pub mod generator;
pub mod request;
pub mod sampler;
pub mod weights;

pub use config::GeneratorConfig;
pub use error::{ConstraintViolation, GenerateError, ViolationKind, WeightError};
pub use generator::{generate, generate_parallel, generate_seeded};
pub use request::{GenerationBatch, GenerationRequest, Method};
pub use weights::WeightVector;
