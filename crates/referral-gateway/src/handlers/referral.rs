use crate::error::{AppError, Result};
use crate::model::{GenerateReferralRequest, GenerateReferralResponse, ReferralResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

pub async fn generate_referral_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<GenerateReferralRequest>, JsonRejection>,
) -> Result<Json<GenerateReferralResponse>> {
    let Json(request) = request?;

    let code = state
        .issuer()
        .issue(&request.service_id, &request.user_id)
        .await?;
    info!(code = %code, user_id = %request.user_id, "generated referral code");

    Ok(Json(GenerateReferralResponse {
        message: "Referral code generated successfully".to_string(),
        referral_code: code.into_inner(),
    }))
}

pub async fn get_referral_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ReferralResponse>> {
    state
        .accounts()
        .referral(&code)
        .await?
        .map(|record| Json(record.into()))
        .ok_or_else(|| AppError::NotFound(format!("referral code '{code}'")))
}
