//! Referral service implementation.
//!
//! [`ReferralIssuer`] turns candidate codes into claimed, persisted referral
//! codes with a bounded optimistic retry loop. [`AccountService`] covers user
//! registration, login and redemption of referral codes at sign-up.

pub mod accounts;
pub mod error;
pub mod issuer;
mod password;

pub use accounts::{AccountService, AccountSettings, RegisterRequest, Registration};
pub use error::{AccountError, ReferralError};
pub use issuer::{IssuerSettings, ReferralIssuer};
