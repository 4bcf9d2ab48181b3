use crate::error::AccountError;
use crate::password::{hash_password_blocking, verify_password_blocking};
use referral_core::{
    NewUser, ReferralCode, ReferralRecord, ReferralStore, Redemption, StoreError, User, UserStore,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

type Result<T> = std::result::Result<T, AccountError>;

const MIN_PASSWORD_LENGTH: usize = 5;
const MAX_PASSWORD_LENGTH: usize = 64;
const DEFAULT_REWARD_POINTS: i64 = 10;

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct AccountSettings {
    /// Points credited to a code's owner when someone registers with it.
    #[builder(default = DEFAULT_REWARD_POINTS)]
    pub reward_points: i64,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parameters for registering a new user.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Code of the user who referred this one, if any.
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    /// Whether the referral code was redeemed by this registration.
    pub referral_applied: bool,
    /// Whether the code's owner received the reward points.
    pub owner_credited: bool,
}

/// What happened to the referral code once the user row exists.
///
/// Store failures after the user row exists end up here, not as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferralOutcome {
    NotApplied,
    Applied { owner_credited: bool },
}

/// User registration, login, and referral redemption at sign-up.
pub struct AccountService<S: ?Sized> {
    store: Arc<S>,
    settings: AccountSettings,
}

impl<S: ?Sized> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AccountError::InvalidInput(format!(
            "email is not valid: '{}'",
            email
        ))),
    }
}

fn validate_password(password: &str) -> Result<()> {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(AccountError::InvalidInput(format!(
            "password length must be between {} and {}",
            MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

impl<S> AccountService<S>
where
    S: ReferralStore + UserStore + ?Sized,
{
    pub fn new(store: Arc<S>, settings: AccountSettings) -> Self {
        Self { store, settings }
    }

    /// Registers a user, redeeming `referral_code` if one is given.
    ///
    /// An unknown or already used code rejects the registration before the
    /// user is created. If another registration redeems the same code in the
    /// meantime, this one still succeeds with `referral_applied = false`.
    /// Once the user row exists, store failures while redeeming or crediting
    /// are logged and reflected in the returned [`Registration`].
    pub async fn register(&self, request: RegisterRequest) -> Result<Registration> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AccountError::InvalidInput("name cannot be empty".to_string()));
        }
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        validate_password(&request.password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken(email));
        }

        let referral = match request.referral_code.as_deref().map(str::trim) {
            None => None,
            Some("") => {
                return Err(AccountError::InvalidInput(
                    "referral code cannot be empty".to_string(),
                ))
            }
            Some(code) => Some(self.usable_referral(code).await?),
        };

        let password_hash = hash_password_blocking(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                name,
                email,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                StoreError::Conflict(email) => AccountError::EmailTaken(email),
                other => AccountError::Store(other),
            })?;
        info!(user_id = %user.id, "registered user");

        let outcome = match referral {
            Some(record) => self.redeem_for(&user, &record.code).await,
            None => ReferralOutcome::NotApplied,
        };

        let (referral_applied, owner_credited) = match outcome {
            ReferralOutcome::NotApplied => (false, false),
            ReferralOutcome::Applied { owner_credited } => (true, owner_credited),
        };
        Ok(Registration {
            user,
            referral_applied,
            owner_credited,
        })
    }

    /// Checks credentials and returns the matching user.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Err(AccountError::UserNotFound);
        };

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await {
            debug!(user_id = %user.id, "password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Looks up a referral code.
    pub async fn referral(&self, code: &str) -> Result<Option<ReferralRecord>> {
        Ok(self
            .store
            .get(&ReferralCode::new_unchecked(code.trim()))
            .await?)
    }

    async fn usable_referral(&self, code: &str) -> Result<ReferralRecord> {
        match self.store.get(&ReferralCode::new_unchecked(code)).await? {
            None => Err(AccountError::ReferralNotFound(code.to_string())),
            Some(record) if record.is_used => {
                Err(AccountError::ReferralAlreadyUsed(code.to_string()))
            }
            Some(record) => Ok(record),
        }
    }

    async fn redeem_for(&self, user: &User, code: &ReferralCode) -> ReferralOutcome {
        let record = match self.store.redeem(code).await {
            Ok(Redemption::Redeemed(record)) => record,
            Ok(Redemption::AlreadyUsed | Redemption::NotFound) => {
                warn!(code = %code, user_id = %user.id, "referral code was consumed concurrently");
                return ReferralOutcome::NotApplied;
            }
            Err(err) => {
                warn!(
                    code = %code,
                    user_id = %user.id,
                    error = %err,
                    "failed to redeem referral code, registering without it"
                );
                return ReferralOutcome::NotApplied;
            }
        };
        info!(
            code = %record.code,
            referred_user_id = %user.id,
            owner_user_id = %record.owner_user_id,
            "redeemed referral code"
        );

        let owner_credited = match self
            .store
            .add_points(&record.owner_user_id, self.settings.reward_points)
            .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    code = %record.code,
                    owner_user_id = %record.owner_user_id,
                    "referral owner is not a registered user, no points credited"
                );
                false
            }
            Err(err) => {
                // The code is already marked used; the reward has to be
                // reconciled from this log line.
                error!(
                    code = %record.code,
                    owner_user_id = %record.owner_user_id,
                    reward_points = self.settings.reward_points,
                    error = %err,
                    "referral redeemed but crediting the owner failed"
                );
                false
            }
        };

        ReferralOutcome::Applied { owner_credited }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use referral_core::error::Result as StoreResult;
    use referral_storage::InMemoryStore;

    fn request(email: &str, referral_code: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
            referral_code: referral_code.map(str::to_string),
        }
    }

    fn service() -> (Arc<InMemoryStore>, AccountService<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let service = AccountService::new(Arc::clone(&store), AccountSettings::default());
        (store, service)
    }

    async fn seed_code(store: &InMemoryStore, code: &str, owner: &str) {
        store
            .insert_if_absent(&ReferralRecord::issue(
                ReferralCode::new_unchecked(code),
                owner,
                "svc",
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn register_then_login() {
        let (_, service) = service();

        let registration = service
            .register(request("Ada@Example.com ", None))
            .await
            .unwrap();
        assert_eq!(registration.user.email, "ada@example.com");
        assert!(!registration.referral_applied);

        let user = service.login("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(user.id, registration.user.id);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let (_, service) = service();

        service
            .register(request("ada@example.com", None))
            .await
            .unwrap();
        let err = service
            .register(request("ADA@example.com", None))
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (_, service) = service();

        let mut blank_name = request("ada@example.com", None);
        blank_name.name = " ".to_string();
        let mut short_password = request("ada@example.com", None);
        short_password.password = "abc".to_string();

        for bad in [
            blank_name,
            short_password,
            request("not-an-email", None),
            request("ada@example.com", Some("  ")),
        ] {
            let err = service.register(bad).await.unwrap_err();
            assert!(matches!(err, AccountError::InvalidInput(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn login_failures() {
        let (_, service) = service();
        service
            .register(request("ada@example.com", None))
            .await
            .unwrap();

        assert_eq!(
            service
                .login("ada@example.com", "wrong-pass")
                .await
                .unwrap_err(),
            AccountError::InvalidCredentials
        );
        assert_eq!(
            service
                .login("bob@example.com", "hunter22")
                .await
                .unwrap_err(),
            AccountError::UserNotFound
        );
    }

    #[tokio::test]
    async fn referral_credits_owner_once() {
        let (store, service) = service();
        let owner = service
            .register(request("owner@example.com", None))
            .await
            .unwrap()
            .user;
        seed_code(&store, "svc-aa-1", &owner.id).await;

        let referred = service
            .register(request("friend@example.com", Some("svc-aa-1")))
            .await
            .unwrap();
        assert!(referred.referral_applied);
        assert!(referred.owner_credited);

        let owner = store.find_user_by_id(&owner.id).await.unwrap().unwrap();
        assert_eq!(owner.points, DEFAULT_REWARD_POINTS);

        let record = service.referral("svc-aa-1").await.unwrap().unwrap();
        assert!(record.is_used);

        let err = service
            .register(request("late@example.com", Some("svc-aa-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::ReferralAlreadyUsed(_)));
        assert!(store
            .find_user_by_email("late@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_referral_rejects_registration() {
        let (store, service) = service();

        let err = service
            .register(request("ada@example.com", Some("svc-missing-1")))
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::ReferralNotFound(_)));
        assert!(store
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn referral_owned_by_unknown_user_still_redeems() {
        let (store, service) = service();
        seed_code(&store, "svc-bb-2", "external-user").await;

        let registration = service
            .register(request("ada@example.com", Some("svc-bb-2")))
            .await
            .unwrap();

        assert!(registration.referral_applied);
        assert!(!registration.owner_credited);
    }

    #[tokio::test]
    async fn concurrent_registrations_redeem_once() {
        let (store, service) = service();
        seed_code(&store, "svc-cc-3", "external-user").await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .register(request(&format!("user{i}@example.com"), Some("svc-cc-3")))
                        .await
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(registration) if registration.referral_applied => applied += 1,
                Ok(_) | Err(AccountError::ReferralAlreadyUsed(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(applied, 1);
    }

    /// Delegates to an in-memory store but can fail `redeem` or `add_points`.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        fail_redeem: bool,
        fail_add_points: bool,
    }

    #[async_trait]
    impl ReferralStore for FlakyStore {
        async fn exists(&self, code: &ReferralCode) -> StoreResult<bool> {
            self.inner.exists(code).await
        }

        async fn insert_if_absent(&self, record: &ReferralRecord) -> StoreResult<()> {
            self.inner.insert_if_absent(record).await
        }

        async fn get(&self, code: &ReferralCode) -> StoreResult<Option<ReferralRecord>> {
            self.inner.get(code).await
        }

        async fn redeem(&self, code: &ReferralCode) -> StoreResult<Redemption> {
            if self.fail_redeem {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.inner.redeem(code).await
        }

        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }
    }

    #[async_trait]
    impl UserStore for FlakyStore {
        async fn create_user(&self, user: NewUser) -> StoreResult<User> {
            self.inner.create_user(user).await
        }

        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_email(email).await
        }

        async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_id(id).await
        }

        async fn add_points(&self, id: &str, delta: i64) -> StoreResult<bool> {
            if self.fail_add_points {
                return Err(StoreError::Timeout("pool timed out".to_string()));
            }
            self.inner.add_points(id, delta).await
        }
    }

    async fn flaky_service(store: FlakyStore) -> (Arc<FlakyStore>, AccountService<FlakyStore>, User) {
        let store = Arc::new(store);
        let service = AccountService::new(Arc::clone(&store), AccountSettings::default());
        let owner = service
            .register(request("owner@example.com", None))
            .await
            .unwrap()
            .user;
        store
            .insert_if_absent(&ReferralRecord::issue(
                ReferralCode::new_unchecked("svc-dd-4"),
                owner.id.as_str(),
                "svc",
            ))
            .await
            .unwrap();
        (store, service, owner)
    }

    #[tokio::test]
    async fn failed_redeem_still_registers_user() {
        let (store, service, owner) = flaky_service(FlakyStore {
            fail_redeem: true,
            ..FlakyStore::default()
        })
        .await;

        let registration = service
            .register(request("friend@example.com", Some("svc-dd-4")))
            .await
            .unwrap();

        assert!(!registration.referral_applied);
        assert!(!registration.owner_credited);
        let code = ReferralCode::new_unchecked("svc-dd-4");
        assert!(!store.get(&code).await.unwrap().unwrap().is_used);
        assert_eq!(
            store.find_user_by_id(&owner.id).await.unwrap().unwrap().points,
            0
        );

        let user = service
            .login("friend@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(user.id, registration.user.id);
    }

    #[tokio::test]
    async fn failed_credit_is_reported_after_redeem() {
        let (store, service, owner) = flaky_service(FlakyStore {
            fail_add_points: true,
            ..FlakyStore::default()
        })
        .await;

        let registration = service
            .register(request("friend@example.com", Some("svc-dd-4")))
            .await
            .unwrap();

        assert!(registration.referral_applied);
        assert!(!registration.owner_credited);
        let code = ReferralCode::new_unchecked("svc-dd-4");
        assert!(store.get(&code).await.unwrap().unwrap().is_used);
        assert_eq!(
            store.find_user_by_id(&owner.id).await.unwrap().unwrap().points,
            0
        );
    }
}
