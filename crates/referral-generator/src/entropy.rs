use crate::error::{GeneratorError, Result};
use rand::rngs::OsRng;
use rand::TryRngCore;

/// A source of cryptographically secure random bytes.
pub trait EntropySource: Send + Sync {
    /// Fills `buf` entirely or fails. Partial fills are never returned.
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Entropy from the operating system RNG.
///
/// Failures are reported instead of falling back to a weaker generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        let mut rng = OsRng;
        rng.try_fill_bytes(buf)
            .map_err(|e| GeneratorError::Entropy(e.to_string()))
    }
}
