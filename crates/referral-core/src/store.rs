use crate::error::Result;
use crate::referral::{ReferralCode, ReferralRecord, Redemption};
use async_trait::async_trait;

/// Durable mapping from referral code to ownership and usage metadata.
///
/// Implementations must be safe to share between many concurrent generation
/// tasks (a connection pool or a concurrent map, never a single connection
/// mutated without synchronization).
#[async_trait]
pub trait ReferralStore: Send + Sync + 'static {
    /// Checks whether a code is already taken.
    ///
    /// This is a fast path only. A `false` answer may be stale by the time the
    /// caller acts on it; [`ReferralStore::insert_if_absent`] is the authority.
    async fn exists(&self, code: &ReferralCode) -> Result<bool>;

    /// Inserts the record only if no record with the same code exists.
    ///
    /// Must be atomic with respect to the uniqueness of `code` and must return
    /// `Err(StoreError::Conflict)` instead of overwriting an existing record.
    async fn insert_if_absent(&self, record: &ReferralRecord) -> Result<()>;

    /// Retrieves the record for a code. Returns `None` if it does not exist.
    async fn get(&self, code: &ReferralCode) -> Result<Option<ReferralRecord>>;

    /// Atomically marks an unused code as used.
    ///
    /// Of any number of concurrent calls for the same code, at most one
    /// observes [`Redemption::Redeemed`].
    async fn redeem(&self, code: &ReferralCode) -> Result<Redemption>;

    /// Verifies the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
