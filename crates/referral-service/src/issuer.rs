use crate::error::ReferralError;
use referral_core::{ReferralCode, ReferralRecord, ReferralStore, StoreError};
use referral_generator::{validate_service_id, CodeGenerator};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, ReferralError>;

const DEFAULT_MAX_ATTEMPTS: u32 = 16;
const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);
const DEFAULT_STORE_BACKOFF: Duration = Duration::from_millis(50);

/// Bounds on a single generation request.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct IssuerSettings {
    /// Candidates tried before giving up. Values below 1 are treated as 1.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Wall-clock budget for the whole request, store calls included.
    #[builder(default = DEFAULT_DEADLINE)]
    pub deadline: Duration,
    /// Pause after a transient store failure. Collisions retry immediately.
    #[builder(default = DEFAULT_STORE_BACKOFF)]
    pub store_backoff: Duration,
}

impl Default for IssuerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Issues referral codes that are unique across the whole store.
///
/// Each request runs an optimistic loop: build a candidate, skip it if the
/// store already has it, otherwise try to claim it with a conditional insert.
/// The insert is the authority on uniqueness; the existence check only saves a
/// round trip on the rare collision. Requests share nothing but the store, so
/// any number of them may run in parallel.
pub struct ReferralIssuer<S: ?Sized, G> {
    store: Arc<S>,
    generator: Arc<G>,
    settings: IssuerSettings,
}

impl<S: ?Sized, G> Clone for ReferralIssuer<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            settings: self.settings,
        }
    }
}

impl<S, G> ReferralIssuer<S, G>
where
    S: ReferralStore + ?Sized,
    G: CodeGenerator,
{
    pub fn new(store: Arc<S>, generator: G, settings: IssuerSettings) -> Self {
        Self {
            store,
            generator: Arc::new(generator),
            settings,
        }
    }

    /// Issues a new code owned by `user_id` under `service_id`.
    ///
    /// Fails fast with [`ReferralError::InvalidInput`] before touching the
    /// store. Otherwise the request is bounded by both `max_attempts` and
    /// `deadline`; when the deadline fires, in-flight store calls are dropped
    /// and [`ReferralError::Timeout`] is returned.
    pub async fn issue(&self, service_id: &str, user_id: &str) -> Result<ReferralCode> {
        validate_service_id(service_id)?;
        if user_id.trim().is_empty() {
            return Err(ReferralError::InvalidInput(
                "user id cannot be empty".to_string(),
            ));
        }

        match tokio::time::timeout(self.settings.deadline, self.claim(service_id, user_id)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    service_id,
                    user_id,
                    deadline = ?self.settings.deadline,
                    "referral code generation timed out"
                );
                Err(ReferralError::Timeout(self.settings.deadline))
            }
        }
    }

    /// Runs [`ReferralIssuer::issue`] on its own task.
    ///
    /// Aborting the returned handle cancels the request the same way the
    /// deadline does.
    pub fn spawn(&self, service_id: String, user_id: String) -> JoinHandle<Result<ReferralCode>>
    where
        S: 'static,
    {
        let issuer = self.clone();
        tokio::spawn(async move { issuer.issue(&service_id, &user_id).await })
    }

    async fn claim(&self, service_id: &str, user_id: &str) -> Result<ReferralCode> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_failure: Option<StoreError> = None;

        for attempt in 1..=max_attempts {
            let code = self.generator.generate(service_id)?;

            match self.store.exists(&code).await {
                Ok(true) => {
                    trace!(attempt, code = %code, "candidate already taken");
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    self.absorb_store_failure(attempt, max_attempts, &err).await?;
                    last_failure = Some(err);
                    continue;
                }
            }

            let record = ReferralRecord::issue(code, user_id, service_id);
            match self.store.insert_if_absent(&record).await {
                Ok(()) => {
                    debug!(attempt, code = %record.code, user_id, "issued referral code");
                    return Ok(record.code);
                }
                Err(StoreError::Conflict(_)) => {
                    debug!(attempt, code = %record.code, "lost insert race, retrying");
                }
                Err(err) => {
                    self.absorb_store_failure(attempt, max_attempts, &err).await?;
                    last_failure = Some(err);
                }
            }
        }

        let reason = match last_failure {
            Some(err) => format!("gave up after {max_attempts} attempts: {err}"),
            None => format!("no unclaimed candidate after {max_attempts} attempts"),
        };
        warn!(service_id, user_id, %reason, "referral code generation exhausted");
        Err(ReferralError::StoreUnavailable(reason))
    }

    /// Decides whether a store failure may be retried, pausing if so.
    async fn absorb_store_failure(
        &self,
        attempt: u32,
        max_attempts: u32,
        err: &StoreError,
    ) -> Result<()> {
        if !err.is_transient() {
            warn!(attempt, error = %err, "store rejected referral operation");
            return Err(ReferralError::StoreUnavailable(err.to_string()));
        }

        warn!(attempt, error = %err, "store call failed, retrying");
        if attempt < max_attempts && !self.settings.store_backoff.is_zero() {
            tokio::time::sleep(self.settings.store_backoff).await;
        }
        Ok(())
    }
}
