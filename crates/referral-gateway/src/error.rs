use axum::extract::rejection::JsonRejection;
use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use referral_service::{AccountError, ReferralError};
use thiserror::Error;
use tracing::error;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

/// Rejected CORS configuration.
#[derive(Debug, Error)]
pub enum CorsError {
    #[error("wildcard origin '*' cannot be combined with credentials; list origins explicitly")]
    Wildcard,
    #[error("invalid origin '{origin}': {source}")]
    InvalidOrigin {
        origin: String,
        source: InvalidHeaderValue,
    },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed request body: {0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Referral(#[from] ReferralError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn status_and_summary(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not found"),
            AppError::Referral(err) => match err {
                ReferralError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid request"),
                ReferralError::EntropySource(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to generate referral code",
                ),
                ReferralError::StoreUnavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "failed to generate referral code",
                ),
                ReferralError::Timeout(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "failed to generate referral code",
                ),
            },
            AppError::Account(err) => match err {
                AccountError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid request"),
                AccountError::EmailTaken(_) => (StatusCode::CONFLICT, "user already exists"),
                AccountError::UserNotFound => (StatusCode::NOT_FOUND, "user not found"),
                AccountError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "incorrect credentials")
                }
                AccountError::ReferralNotFound(_) => {
                    (StatusCode::NOT_FOUND, "referral code not found")
                }
                AccountError::ReferralAlreadyUsed(_) => {
                    (StatusCode::CONFLICT, "referral code already used")
                }
                AccountError::PasswordHash(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "cannot create user at the moment",
                ),
                AccountError::Store(store) if store.is_transient() => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage unavailable",
                ),
                AccountError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage error")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, summary) = self.status_and_summary();
        if status.is_server_error() {
            error!(status = %status, error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: summary.to_string(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use referral_core::StoreError;
    use std::time::Duration;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn referral_errors_map_by_kind() {
        assert_eq!(
            status(ReferralError::InvalidInput("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ReferralError::EntropySource("rng".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ReferralError::StoreUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(ReferralError::Timeout(Duration::from_secs(5))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn account_errors_map_by_kind() {
        assert_eq!(
            status(AccountError::EmailTaken("a@b.c".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(AccountError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AccountError::Store(StoreError::Timeout("pool".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(AccountError::Store(StoreError::Query("syntax".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
