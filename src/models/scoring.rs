use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const SCORING_VERSION: &str = "v1";
pub const ENGINE_VERSION: &str = "personality-engine-1.0.0";

/// A submitted response set: question id -> ordinal value in [1,5].
pub type ResponseSet = HashMap<String, i32>;

/// The outcome of `Scorer::score`. Every numeric field rounds to 3 decimals.
/// Absent dimensions are `None`, never defaulted to a midpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScoringResult {
    pub ocean: Ocean,
    pub traits: TraitMap,
    pub facets: HashMap<String, Option<f64>>,
    pub persona_id: String,
    pub mbti_proxy: Option<String>,
    pub confidence: f64,
    pub trait_confidence: HashMap<String, f64>,
    pub facet_confidence: HashMap<String, f64>,
    pub top_facets: Vec<String>,
    pub personality_code: Option<String>,
    pub neuroticism_level: Option<String>,
    pub has_complete_profile: bool,
    pub traits_with_data: Vec<String>,
    pub coverage: HashMap<String, usize>,
    pub responses_count: usize,
    pub metadata: ScoringMetadata,
}

/// Canonical OCEAN vector. Absent dimensions serialize as `null` — this
/// is the "canonical" representation used on the wire, distinct from the
/// `traits` long-named map which carries the same values under
/// friendlier keys.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Ocean {
    pub o: Option<f64>,
    pub c: Option<f64>,
    pub e: Option<f64>,
    pub a: Option<f64>,
    pub n: Option<f64>,
}

pub type TraitMap = HashMap<String, Option<f64>>;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScoringMetadata {
    pub scoring_version: String,
    pub engine_version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub quiz_type: String,
    pub input_hash: String,
    pub output_hash: String,
}

/// Structured report produced by `Scorer::validate_responses`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub warnings: Vec<ValidationWarning>,
    pub coverage: HashMap<String, usize>,
    pub missing_traits: Vec<String>,
    pub total_responses: usize,
    pub valid_responses: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidationWarning {
    pub severity: String,
    pub kind: String,
    pub detail: String,
}
