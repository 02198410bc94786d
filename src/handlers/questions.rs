//! `GET /v1/questions`. Composition only: extract, call the one
//! service method, wrap the result.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::Question;
use crate::utils::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuestionsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionListResponse {
    pub items: Vec<Question>,
    pub total: usize,
}

#[utoipa::path(
    get,
    path = "/v1/questions",
    params(ListQuestionsQuery),
    responses(
        (status = 200, description = "Ordered, trait-balanced item list", body = QuestionListResponse),
        (status = 404, description = "requested limit exceeds the catalog"),
        (status = 500),
    ),
    tag = "Questions"
)]
pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<ListQuestionsQuery>,
) -> ApiResult<Json<QuestionListResponse>> {
    let catalog_size = state.question_bank.all().len();
    let limit = query.limit.unwrap_or(catalog_size);
    if limit == 0 || limit > catalog_size {
        return Err(ApiError::not_found(format!("no question set available for limit {limit}")));
    }
    let items = state.question_bank.ordered(limit);
    Ok(Json(QuestionListResponse { total: items.len(), items }))
}
