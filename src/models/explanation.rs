use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Child of one Assessment. Normalized superset of the new
/// (persona_title/vibe_summary/...) and legacy (summary/challenges)
/// provider response shapes — see `services::llm::provider` for the
/// normalizer that produces this from raw provider output.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Explanation {
    pub assessment_id: Uuid,
    pub persona_title: String,
    pub vibe_summary: String,
    pub strengths: sqlx::types::Json<Vec<String>>,
    pub growth_edges: sqlx::types::Json<Vec<String>>,
    pub how_you_show_up: String,
    pub tagline: String,
    pub model_name: String,
    pub tokens_used: Option<i64>,
    pub generation_time_ms: i64,
    pub error: Option<String>,
    pub raw_response: Option<String>,
    pub is_fallback: bool,
}

impl Explanation {
    /// Backward-compatible alias fields a legacy client might expect.
    pub fn summary(&self) -> String {
        if self.how_you_show_up.is_empty() {
            self.vibe_summary.clone()
        } else {
            format!("{}\n\n{}", self.vibe_summary, self.how_you_show_up)
        }
    }

    pub fn challenges(&self) -> Vec<String> {
        self.growth_edges.0.clone()
    }
}
