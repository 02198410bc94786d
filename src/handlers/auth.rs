//! Signup/login/reset/update-password/logout. Rate-limit check before
//! every Store delegation, following the pre-flight-check-then-call
//! handler shape used throughout this module.

use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::Json;
use validator::Validate;

use crate::middleware::{client_ip, AuthUser};
use crate::models::{
    LoginRequest, LoginResponse, MessageResponse, ResetPasswordRequest, SignupRequest, SignupResponse,
    UpdatePasswordRequest,
};
use crate::services::rate_limiter::limits;
use crate::utils::error::{ApiError, ApiResult};
use crate::AppState;

fn validation_err(e: validator::ValidationErrors) -> ApiError {
    ApiError::validation_error(e.to_string())
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses((status = 200, body = SignupResponse), (status = 422), (status = 429)),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    request.validate().map_err(validation_err)?;

    let ip = client_ip(&headers);
    state
        .rate_limiter
        .check("signup", &ip, limits::SIGNUP)
        .map_err(|e| ApiError::rate_limited("too many signup attempts", e.retry_after_secs))?;

    let user_id = state.store.sign_up(&request.email, &request.password, &request.profile_id).await?;
    Ok(Json(SignupResponse { message: "account created".to_string(), user_id: user_id.to_string() }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses((status = 200, body = LoginResponse), (status = 401), (status = 429)),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let ip = client_ip(&headers);
    state
        .rate_limiter
        .check("login", &ip, limits::LOGIN)
        .map_err(|e| ApiError::rate_limited("too many login attempts", e.retry_after_secs))?;

    let session = state.store.sign_in(&request.identifier, &request.password).await?;
    Ok(Json(LoginResponse { message: "signed in".to_string(), session }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses((status = 200, body = MessageResponse), (status = 429)),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    request.validate().map_err(validation_err)?;

    let ip = client_ip(&headers);
    state
        .rate_limiter
        .check("reset_password", &ip, limits::RESET_PASSWORD)
        .map_err(|e| ApiError::rate_limited("too many reset attempts", e.retry_after_secs))?;

    // Always responds identically whether or not the account exists.
    state.store.reset_password(&request.email).await?;
    Ok(Json(MessageResponse { message: "if an account exists, a reset link has been sent".to_string() }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/update-password",
    request_body = UpdatePasswordRequest,
    responses((status = 200, body = MessageResponse), (status = 401), (status = 422)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn update_password(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(request): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    request.validate().map_err(validation_err)?;
    state.store.update_password(user_id, &request.new_password).await?;
    Ok(Json(MessageResponse { message: "password updated".to_string() }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses((status = 200, body = MessageResponse)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>, Extension(AuthUser(_)): Extension<AuthUser>) -> ApiResult<Json<MessageResponse>> {
    state.store.sign_out().await?;
    Ok(Json(MessageResponse { message: "signed out".to_string() }))
}
