//! Assessment creation, retrieval, explanation generation, bulk sync,
//! and history. Extractor composition follows the other handler
//! modules; the validation gate is ported from
//! `original_source/backend/src/api/assessments.py`.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::middleware::client_ip;
use crate::models::{
    AssessmentSummary, CanonicalAssessmentResponse, CanonicalMetadata, CreateAssessmentRequest, DominantInfo,
    Ocean, PagedHistory, Trait,
};
use crate::scorer::{neuroticism_level_for, personality_code, Scorer};
use crate::services::llm::{DominantInput, ExplanationDto, ToneProfile};
use crate::services::rate_limiter::limits;
use crate::utils::error::{ApiError, ApiResult};
use crate::validators::{clamp_pagination, sanitize_answers};
use crate::AppState;

/// Shared by `create_assessment` and `sync_assessments`: sanitize, gate on
/// trait coverage, score, and persist.
async fn score_and_persist(
    state: &AppState,
    request: CreateAssessmentRequest,
) -> ApiResult<(Uuid, CanonicalAssessmentResponse)> {
    let responses = sanitize_answers(&request.responses);
    let scorer = Scorer::new(&state.question_bank);

    let report = scorer.validate_responses(&responses);
    if !report.is_valid {
        return Err(ApiError::validation_error(format!(
            "unbalanced or invalid response set failed validation: coverage={:?}, missing_traits={:?}",
            report.coverage, report.missing_traits
        )));
    }

    let scoring = scorer.score(&responses, &request.quiz_type);
    let assessment = state.store.create_assessment(request.user_id, &responses, &scoring).await?;

    if let Some(user_id) = request.user_id {
        state.store.upsert_profile(user_id, assessment.id).await?;
    }

    let response = crate::services::Store::canonical_response(assessment.id, &scoring);
    Ok((assessment.id, response))
}

#[utoipa::path(
    post,
    path = "/v1/assessments",
    request_body = CreateAssessmentRequest,
    responses(
        (status = 200, description = "Canonical scored assessment", body = CanonicalAssessmentResponse),
        (status = 422, description = "response set fails trait-coverage validation"),
        (status = 500),
    ),
    tag = "Assessments"
)]
pub async fn create_assessment(
    State(state): State<AppState>,
    Json(request): Json<CreateAssessmentRequest>,
) -> ApiResult<Json<CanonicalAssessmentResponse>> {
    let (_, response) = score_and_persist(&state, request).await?;
    Ok(Json(response))
}

/// Rebuilds the canonical wire shape from a persisted summary row, since
/// only `mbti_code`/`trait_scores` survive the round trip, not the
/// derived `personality_code`.
fn canonical_from_summary(id: Uuid, summary: &AssessmentSummary) -> CanonicalAssessmentResponse {
    let long_name = |t: Trait| summary.trait_scores.0.get(t.long_name()).copied().flatten();
    let ocean = Ocean {
        o: long_name(Trait::O),
        c: long_name(Trait::C),
        e: long_name(Trait::E),
        a: long_name(Trait::A),
        n: long_name(Trait::N),
    };
    let is_complete = Trait::ALL.iter().all(|t| long_name(*t).is_some());
    let traits_with_data =
        Trait::ALL.iter().filter(|t| long_name(**t).is_some()).map(|t| t.long_name().to_string()).collect();

    let dominant_code = match (&summary.mbti_code, ocean.n) {
        (Some(mbti), Some(n)) => Some(personality_code(mbti, &neuroticism_level_for(n))),
        _ => None,
    };

    CanonicalAssessmentResponse {
        assessment_id: id,
        ocean,
        persona_id: summary.persona_id.clone(),
        mbti_proxy: summary.mbti_code.clone(),
        confidence: summary.confidence,
        metadata: CanonicalMetadata {
            quiz_type: summary.quiz_type.clone(),
            engine_version: crate::models::ENGINE_VERSION.to_string(),
            scoring_version: summary.scoring_version.clone(),
            timestamp: summary.created_at,
        },
        traits: summary.trait_scores.0.clone(),
        facets: summary.facet_scores.0.clone(),
        dominant: DominantInfo { mbti_proxy: summary.mbti_code.clone(), personality_code: dominant_code },
        is_complete,
        traits_with_data,
    }
}

#[utoipa::path(
    get,
    path = "/v1/assessments/{id}",
    responses(
        (status = 200, description = "Canonical assessment", body = CanonicalAssessmentResponse),
        (status = 404),
        (status = 500),
    ),
    tag = "Assessments"
)]
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CanonicalAssessmentResponse>> {
    let summary = state.store.get_assessment(id).await?;
    Ok(Json(canonical_from_summary(id, &summary)))
}

#[utoipa::path(
    post,
    path = "/v1/assessments/{id}/generate_explanation",
    responses(
        (status = 200, description = "LLM-authored or fallback explanation", body = ExplanationDto),
        (status = 404),
        (status = 429, description = "rate limit or daily/hourly quota exceeded"),
        (status = 503, description = "no explanation provider configured"),
        (status = 500),
    ),
    tag = "Assessments"
)]
pub async fn generate_explanation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<ExplanationDto>> {
    let ip = client_ip(&headers);

    state
        .rate_limiter
        .check("generate_explanation", &ip, limits::GENERATE_EXPLANATION)
        .map_err(|e| ApiError::rate_limited("too many explanation requests", e.retry_after_secs))?;

    let assessment = state.store.get_assessment_full(id).await?;
    let identity = assessment.user_id.map(|u| u.to_string()).unwrap_or_else(|| ip.clone());

    let (allowed, reason) = state.quota_tracker.check_quota(&identity);
    if !allowed {
        return Err(ApiError::quota_exceeded(reason.unwrap_or_else(|| "quota exceeded".to_string()), 3600));
    }

    let mbti = assessment.mbti_code.clone().unwrap_or_else(|| "unknown".to_string());
    let persona = state.persona_registry.by_tag(&mbti).cloned().unwrap_or_else(crate::models::Persona::unknown);

    let n = assessment.trait_scores.0.get("neuroticism").copied().flatten();
    let code = match n {
        Some(n) => personality_code(&mbti, &neuroticism_level_for(n)),
        None => format!("{mbti}-?"),
    };
    let dominant = DominantInput { mbti_proxy: mbti, personality_code: code };

    let explanation = state
        .llm_router
        .generate_explanation(
            &assessment.trait_scores.0,
            &assessment.facet_scores.0,
            assessment.confidence,
            &dominant,
            None::<&ToneProfile>,
            &persona.title,
            &persona.tagline,
        )
        .await?;

    state.store.save_explanation(id, &explanation).await?;
    state.quota_tracker.record_usage(&identity);

    Ok(Json(explanation))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncAssessmentsRequest {
    pub items: Vec<CreateAssessmentRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncItemResult {
    Ok { index: usize, assessment: CanonicalAssessmentResponse },
    Error { index: usize, detail: String },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncAssessmentsResponse {
    pub results: Vec<SyncItemResult>,
}

#[utoipa::path(
    post,
    path = "/v1/assessments/sync",
    request_body = SyncAssessmentsRequest,
    responses((status = 200, description = "Per-item success/failure, never fails the whole batch", body = SyncAssessmentsResponse)),
    tag = "Assessments"
)]
pub async fn sync_assessments(
    State(state): State<AppState>,
    Json(request): Json<SyncAssessmentsRequest>,
) -> Json<SyncAssessmentsResponse> {
    let mut results = Vec::with_capacity(request.items.len());
    for (index, item) in request.items.into_iter().enumerate() {
        match score_and_persist(&state, item).await {
            Ok((_, assessment)) => results.push(SyncItemResult::Ok { index, assessment }),
            Err(e) => results.push(SyncItemResult::Error { index, detail: e.to_string() }),
        }
    }
    Json(SyncAssessmentsResponse { results })
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/v1/assessments/{user_id}/history",
    params(HistoryQuery),
    responses((status = 200, description = "Paginated assessment history", body = PagedHistory), (status = 500)),
    tag = "Assessments"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<PagedHistory>> {
    let (page, page_size) = clamp_pagination(query.page.unwrap_or(1), query.page_size.unwrap_or(20));
    let history = state.store.get_history(user_id, page, page_size).await?;
    Ok(Json(history))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn summary_with(trait_scores: HashMap<String, Option<f64>>, mbti_code: Option<String>) -> AssessmentSummary {
        AssessmentSummary {
            id: Uuid::nil(),
            created_at: chrono::Utc::now(),
            trait_scores: sqlx::types::Json(trait_scores),
            facet_scores: sqlx::types::Json(HashMap::new()),
            mbti_code,
            persona_id: "analyst".to_string(),
            confidence: 0.8,
            metadata: sqlx::types::Json(serde_json::json!({})),
            scoring_version: "v1".to_string(),
            quiz_type: "quick".to_string(),
        }
    }

    #[test]
    fn absent_trait_serializes_as_null_and_marks_incomplete() {
        let scores: HashMap<String, Option<f64>> = [
            ("openness".to_string(), Some(0.5)),
            ("conscientiousness".to_string(), Some(0.5)),
            ("extraversion".to_string(), Some(0.5)),
            ("agreeableness".to_string(), Some(0.5)),
            ("neuroticism".to_string(), None),
        ]
        .into_iter()
        .collect();

        let summary = summary_with(scores, None);
        let response = canonical_from_summary(Uuid::nil(), &summary);

        assert_eq!(response.ocean.n, None);
        assert!(!response.is_complete);
        assert_eq!(response.mbti_proxy, None);
        assert_eq!(response.traits_with_data.len(), 4);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["ocean"]["n"].is_null());
    }

    #[test]
    fn complete_profile_reconstructs_dominant_personality_code() {
        let scores: HashMap<String, Option<f64>> = [
            ("openness".to_string(), Some(0.5)),
            ("conscientiousness".to_string(), Some(0.5)),
            ("extraversion".to_string(), Some(0.5)),
            ("agreeableness".to_string(), Some(0.5)),
            ("neuroticism".to_string(), Some(0.2)),
        ]
        .into_iter()
        .collect();

        let summary = summary_with(scores, Some("INTJ".to_string()));
        let response = canonical_from_summary(Uuid::nil(), &summary);

        assert!(response.is_complete);
        assert_eq!(response.mbti_proxy, Some("INTJ".to_string()));
        assert!(response.dominant.personality_code.is_some());
    }
}
