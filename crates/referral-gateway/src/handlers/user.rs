use crate::error::Result;
use crate::model::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn register_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = request?;

    let registration = state.accounts().register(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user_id: registration.user.id,
            referral_applied: registration.referral_applied,
            owner_credited: registration.owner_credited,
        }),
    ))
}

pub async fn login_handler(
    State(state): State<AppState>,
    request: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(request) = request?;

    let user = state
        .accounts()
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        message: "Logged in successfully".to_string(),
        user_id: user.id,
    }))
}
