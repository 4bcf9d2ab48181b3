use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use referral_core::error::Result;
use referral_core::{
    NewUser, ReferralCode, ReferralRecord, ReferralStore, Redemption, StoreError, User, UserStore,
};
use uuid::Uuid;

/// In-memory implementation of the store traits using DashMap.
///
/// DashMap shards its locks, so concurrent generation tasks only contend when
/// they touch the same bucket. The entry API gives insert-if-absent the same
/// atomicity a unique index gives the Postgres backend.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    referrals: DashMap<String, ReferralRecord>,
    users: DashMap<String, User>,
    /// email -> user id
    emails: DashMap<String, String>,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store sized for `capacity` referral codes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            referrals: DashMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Number of referral codes held.
    pub fn referral_count(&self) -> usize {
        self.referrals.len()
    }
}

#[async_trait]
impl ReferralStore for InMemoryStore {
    async fn exists(&self, code: &ReferralCode) -> Result<bool> {
        Ok(self.referrals.contains_key(code.as_str()))
    }

    async fn insert_if_absent(&self, record: &ReferralRecord) -> Result<()> {
        match self.referrals.entry(record.code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(record.code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, code: &ReferralCode) -> Result<Option<ReferralRecord>> {
        Ok(self
            .referrals
            .get(code.as_str())
            .map(|entry| entry.value().clone()))
    }

    async fn redeem(&self, code: &ReferralCode) -> Result<Redemption> {
        let Some(mut entry) = self.referrals.get_mut(code.as_str()) else {
            return Ok(Redemption::NotFound);
        };

        if entry.is_used {
            return Ok(Redemption::AlreadyUsed);
        }

        entry.is_used = true;
        Ok(Redemption::Redeemed(entry.value().clone()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        // Hold the email slot while the user row is written so two concurrent
        // registrations for the same address cannot both succeed.
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(user.email)),
            Entry::Vacant(slot) => {
                let created = User {
                    id: Uuid::new_v4().to_string(),
                    name: user.name,
                    email: user.email,
                    password_hash: user.password_hash,
                    points: 0,
                };
                self.users.insert(created.id.clone(), created.clone());
                slot.insert(created.id.clone());
                Ok(created)
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let Some(id) = self.emails.get(email).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn add_points(&self, id: &str, delta: i64) -> Result<bool> {
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(false);
        };
        user.points += delta;
        Ok(true)
    }
}
