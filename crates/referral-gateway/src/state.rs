use std::sync::Arc;

use referral_core::{ReferralStore, UserStore};
use referral_generator::{CandidateGenerator, CandidateSettings};
use referral_service::{AccountService, AccountSettings, IssuerSettings, ReferralIssuer};
use typed_builder::TypedBuilder;

/// A backend that stores both referral codes and users.
pub trait AppStore: ReferralStore + UserStore {}

impl<T: ReferralStore + UserStore> AppStore for T {}

#[derive(Debug, Clone, Copy, Default, TypedBuilder)]
pub struct GatewaySettings {
    #[builder(default)]
    pub candidate: CandidateSettings,
    #[builder(default)]
    pub issuer: IssuerSettings,
    #[builder(default)]
    pub accounts: AccountSettings,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn AppStore>,
    issuer: ReferralIssuer<dyn AppStore, CandidateGenerator>,
    accounts: AccountService<dyn AppStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn AppStore>, settings: GatewaySettings) -> Self {
        Self {
            issuer: ReferralIssuer::new(
                Arc::clone(&store),
                CandidateGenerator::new(settings.candidate),
                settings.issuer,
            ),
            accounts: AccountService::new(Arc::clone(&store), settings.accounts),
            store,
        }
    }

    pub fn store(&self) -> &dyn AppStore {
        self.store.as_ref()
    }

    pub fn issuer(&self) -> &ReferralIssuer<dyn AppStore, CandidateGenerator> {
        &self.issuer
    }

    pub fn accounts(&self) -> &AccountService<dyn AppStore> {
        &self.accounts
    }
}
