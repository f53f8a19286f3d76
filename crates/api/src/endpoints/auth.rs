//! Sign-in endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use policyai_common::AppResult;
use policyai_core::{
    AuthToken, GoogleSignInInput, OtpDispatch, SendOtpInput, UserSummary, VerifyOtpInput,
};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Email a one-time login code.
async fn send_otp(
    State(state): State<AppState>,
    Json(input): Json<SendOtpInput>,
) -> AppResult<ApiResponse<OtpDispatch>> {
    let dispatch = state.auth_service.send_otp(input).await?;
    Ok(ApiResponse::ok(dispatch))
}

/// Exchange a login code for an access token.
async fn verify_otp(
    State(state): State<AppState>,
    Json(input): Json<VerifyOtpInput>,
) -> AppResult<ApiResponse<AuthToken>> {
    let token = state.auth_service.verify_otp(input).await?;
    Ok(ApiResponse::ok(token))
}

/// Exchange a Google ID token for an access token.
async fn google_signin(
    State(state): State<AppState>,
    Json(input): Json<GoogleSignInInput>,
) -> AppResult<ApiResponse<AuthToken>> {
    let token = state.auth_service.google_signin(input).await?;
    Ok(ApiResponse::ok(token))
}

/// The signed-in user.
async fn me(AuthUser(user): AuthUser) -> AppResult<ApiResponse<UserSummary>> {
    Ok(ApiResponse::ok(UserSummary::from(&user)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email/send-otp", post(send_otp))
        .route("/email/verify-otp", post(verify_otp))
        .route("/google/signin", post(google_signin))
        .route("/me", get(me))
}
