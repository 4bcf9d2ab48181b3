use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors returned while constructing a candidate code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("entropy source failed: {0}")]
    Entropy(String),
    #[error("invalid service id: {0}")]
    InvalidServiceId(String),
}
