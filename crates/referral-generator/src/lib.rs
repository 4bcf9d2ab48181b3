//! Candidate referral-code construction.
//!
//! Generators here are pure: they combine a service id, fresh random bytes
//! and a high-resolution timestamp into a candidate code, and never talk to
//! a store. Claiming a candidate is the issuer's job.

mod candidate;
mod clock;
mod entropy;
pub mod error;

pub use candidate::{
    validate_service_id, CandidateGenerator, CandidateSettings, MIN_RANDOM_BYTES,
};
pub use clock::{Clock, SystemClock};
pub use entropy::{EntropySource, OsEntropy};
pub use error::{GeneratorError, Result};

use referral_core::ReferralCode;

/// Trait for producing candidate referral codes.
///
/// Implementations must not consult any store. Independent candidates should
/// be collision-free with overwhelming probability on their own; global
/// uniqueness is still enforced by the store's conditional insert.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Produces one candidate code for the given service.
    fn generate(&self, service_id: &str) -> Result<ReferralCode>;
}
