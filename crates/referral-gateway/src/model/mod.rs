mod health;
mod referral;
mod user;

pub use health::HealthResponse;
pub use referral::{GenerateReferralRequest, GenerateReferralResponse, ReferralResponse};
pub use user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}
