//! Bearer-token authentication: Bearer-header extraction,
//! `jwt_util.verify_token`, extension insertion for downstream handlers.
//! No role or organization system here, only a flat per-user JWT
//! session.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::utils::error::ApiError;
use crate::AppState;

/// Inserted into request extensions once the bearer token verifies;
/// handlers read it with `Extension<AuthUser>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let header_value =
        req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).ok_or_else(ApiError::unauthorized)?;

    let token = header_value.strip_prefix("Bearer ").ok_or_else(ApiError::unauthorized)?;
    let claims = state.jwt_util.verify_token(token)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::unauthorized())?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}
