use referral_core::ReferralRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GenerateReferralRequest {
    pub service_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateReferralResponse {
    pub message: String,
    pub referral_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferralResponse {
    pub referral_code: String,
    pub owner_user_id: String,
    pub service_id: String,
    pub is_used: bool,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<ReferralRecord> for ReferralResponse {
    fn from(record: ReferralRecord) -> Self {
        Self {
            referral_code: record.code.into_inner(),
            owner_user_id: record.owner_user_id,
            service_id: record.service_id,
            is_used: record.is_used,
            created_at: record.created_at.to_string(),
        }
    }
}
