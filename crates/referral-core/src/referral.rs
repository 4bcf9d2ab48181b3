use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Separator between the segments of a generated referral code.
pub const CODE_DELIMITER: char = '-';

/// An opaque referral code.
///
/// Generated codes have the shape `{service_id}-{hex}-{nanos}`, but callers
/// should treat the value as an opaque key. Codes arriving from clients are
/// accepted as-is and simply looked up.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Wraps a code string without validation.
    ///
    /// Generated codes come from a trusted constructor and codes supplied by
    /// clients are only ever used as lookup keys, so there is nothing to check.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ReferralCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted referral code and its ownership/usage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralRecord {
    /// The unique code; primary key in every store.
    pub code: ReferralCode,
    /// The user the code was issued for.
    pub owner_user_id: String,
    /// The service the code was generated under.
    pub service_id: String,
    /// Flips to `true` exactly once, when the code is redeemed.
    pub is_used: bool,
    /// When the code was issued.
    pub created_at: Timestamp,
}

impl ReferralRecord {
    /// Creates a fresh, unused record issued now.
    pub fn issue(
        code: ReferralCode,
        owner_user_id: impl Into<String>,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            owner_user_id: owner_user_id.into(),
            service_id: service_id.into(),
            is_used: false,
            created_at: Timestamp::now(),
        }
    }
}

/// Outcome of an atomic redemption attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Redemption {
    /// The code was unused and is now marked used. Carries the updated record.
    Redeemed(ReferralRecord),
    /// The code exists but was redeemed earlier.
    AlreadyUsed,
    /// No record with this code exists.
    NotFound,
}
