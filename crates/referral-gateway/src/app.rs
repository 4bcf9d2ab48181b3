use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::CorsError;
use crate::handlers::{
    generate_referral_handler, get_referral_handler, health_handler, login_handler,
    register_handler, root_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            // Paths kept from the first version of the API.
            .route("/register", post(register_handler))
            .route("/login", post(login_handler))
            .route("/generateReferal", post(generate_referral_handler))
            .nest(
                "/v1",
                Router::new()
                    .route("/users/register", post(register_handler))
                    .route("/users/login", post(login_handler))
                    .route("/referrals", post(generate_referral_handler))
                    .route("/referrals/{code}", get(get_referral_handler)),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Builds the CORS policy for browser clients at `origins`.
    ///
    /// Credentials are allowed, so every origin must be listed explicitly.
    pub fn cors(origins: &[String]) -> Result<CorsLayer, CorsError> {
        let origins = origins
            .iter()
            .map(|origin| {
                let origin = origin.trim();
                if origin == "*" {
                    return Err(CorsError::Wildcard);
                }
                HeaderValue::from_str(origin).map_err(|source| CorsError::InvalidOrigin {
                    origin: origin.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::PATCH,
            ])
            .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true))
    }
}
