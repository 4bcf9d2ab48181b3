use referral_core::StoreError;
use referral_generator::GeneratorError;
use std::time::Duration;
use thiserror::Error;

/// Final outcome of a failed generation request.
///
/// Duplicate-key rejections never appear here; the issuer absorbs them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferralError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("entropy source failed: {0}")]
    EntropySource(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("referral code generation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<GeneratorError> for ReferralError {
    fn from(value: GeneratorError) -> Self {
        match value {
            GeneratorError::Entropy(message) => Self::EntropySource(message),
            GeneratorError::InvalidServiceId(message) => Self::InvalidInput(message),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("referral code not found: {0}")]
    ReferralNotFound(String),
    #[error("referral code already used: {0}")]
    ReferralAlreadyUsed(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
