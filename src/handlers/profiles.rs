//! `GET /v1/profiles/{user_id}`.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::models::Profile;
use crate::utils::error::ApiResult;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/v1/profiles/{user_id}",
    responses(
        (status = 200, description = "Latest profile", body = Profile),
        (status = 404, description = "no profile for this user"),
        (status = 500),
    ),
    tag = "Profiles"
)]
pub async fn get_profile(State(state): State<AppState>, Path(user_id): Path<Uuid>) -> ApiResult<Json<Profile>> {
    let profile = state.store.get_profile(user_id).await?;
    Ok(Json(profile))
}
