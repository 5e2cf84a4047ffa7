use thiserror::Error;

/// Broad class of a constraint violation, for callers mapping errors to messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Range,
    Duplicate,
    Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    #[error("combination count must be at least 1")]
    CombinationCount,
    #[error("lucky number {0} is outside 1-49")]
    LuckyOutOfRange(u8),
    #[error("selected number {0} is outside 1-49")]
    SelectedOutOfRange(u8),
    #[error("selected number {0} appears more than once")]
    DuplicateSelected(u8),
    #[error("lucky number {0} is also a selected number")]
    LuckyAmongSelected(u8),
    #[error("{mandatory} mandatory numbers do not fit in a combination of {required}")]
    Overflow { mandatory: usize, required: usize },
}

impl ConstraintViolation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            ConstraintViolation::CombinationCount
            | ConstraintViolation::LuckyOutOfRange(_)
            | ConstraintViolation::SelectedOutOfRange(_) => ViolationKind::Range,
            ConstraintViolation::DuplicateSelected(_)
            | ConstraintViolation::LuckyAmongSelected(_) => ViolationKind::Duplicate,
            ConstraintViolation::Overflow { .. } => ViolationKind::Overflow,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeightError {
    #[error("expected {expected} weights, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("weight for number {number} is negative or not finite: {value}")]
    InvalidEntry { number: u8, value: f64 },
    #[error("mix weights must be non-negative and sum to 1 (sum = {0})")]
    MixNotConvex(f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("invalid constraint: {0}")]
    InvalidConstraint(#[from] ConstraintViolation),
    #[error("follow-on generation needs a reference draw")]
    MissingReferenceDraw,
    #[error("insufficient history: {available} draws, at least {required} required")]
    InsufficientHistory { available: usize, required: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Weights(#[from] WeightError),
}
