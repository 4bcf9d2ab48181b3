//! Core types and traits for the referral service.
//!
//! This crate provides the domain types shared by the code generator,
//! the storage backends and the HTTP gateway, together with the store
//! contracts the generator relies on for uniqueness.

pub mod error;
pub mod referral;
pub mod store;
pub mod user;

pub use error::StoreError;
pub use referral::{ReferralCode, ReferralRecord, Redemption, CODE_DELIMITER};
pub use store::ReferralStore;
pub use user::{NewUser, User, UserStore};
