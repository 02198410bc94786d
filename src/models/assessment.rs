use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::scoring::ResponseSet;

/// Full row as persisted. Immutable after scoring except for the later,
/// optional attachment of an `Explanation` and the `needs_retake` flag.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub user_id: Option<Uuid>,
    pub quiz_type: String,
    pub raw_responses: sqlx::types::Json<ResponseSet>,
    pub trait_scores: sqlx::types::Json<HashMap<String, Option<f64>>>,
    pub facet_scores: sqlx::types::Json<HashMap<String, Option<f64>>>,
    pub mbti_code: Option<String>,
    pub persona_id: String,
    pub confidence: f64,
    pub scoring_version: String,
    pub metadata: sqlx::types::Json<serde_json::Value>,
    pub needs_retake: bool,
}

/// Narrow projection used by `get_assessment` / cache entries / the
/// canonical HTTP response. Deliberately excludes `raw_responses`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct AssessmentSummary {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub trait_scores: sqlx::types::Json<HashMap<String, Option<f64>>>,
    pub facet_scores: sqlx::types::Json<HashMap<String, Option<f64>>>,
    pub mbti_code: Option<String>,
    pub persona_id: String,
    pub confidence: f64,
    pub metadata: sqlx::types::Json<serde_json::Value>,
    pub scoring_version: String,
    pub quiz_type: String,
}

/// `get_assessment_scores` projection: just the scored output, no
/// metadata or raw responses — for callers that only need the numbers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct AssessmentScores {
    pub id: Uuid,
    pub trait_scores: sqlx::types::Json<HashMap<String, Option<f64>>>,
    pub facet_scores: sqlx::types::Json<HashMap<String, Option<f64>>>,
    pub mbti_code: Option<String>,
    pub confidence: f64,
}

/// `get_history` projection: deliberately the smallest field set for the
/// list view. Bandwidth is a first-class concern per the Store contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub quiz_type: String,
    pub mbti_code: Option<String>,
    pub persona_id: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PagedHistory {
    pub items: Vec<HistoryEntry>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAssessmentRequest {
    pub user_id: Option<Uuid>,
    #[serde(default = "default_quiz_type")]
    pub quiz_type: String,
    pub responses: ResponseSet,
}

fn default_quiz_type() -> String {
    "quick".to_string()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CanonicalAssessmentResponse {
    pub assessment_id: Uuid,
    pub ocean: super::scoring::Ocean,
    pub persona_id: String,
    pub mbti_proxy: Option<String>,
    pub confidence: f64,
    pub metadata: CanonicalMetadata,
    pub traits: HashMap<String, Option<f64>>,
    pub facets: HashMap<String, Option<f64>>,
    pub dominant: DominantInfo,
    pub is_complete: bool,
    pub traits_with_data: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CanonicalMetadata {
    pub quiz_type: String,
    pub engine_version: String,
    pub scoring_version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DominantInfo {
    pub mbti_proxy: Option<String>,
    pub personality_code: Option<String>,
}
