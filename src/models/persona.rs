use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named archetype keyed by MBTI-proxy code. Static, small, read-only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Persona {
    pub tag: String,
    pub title: String,
    pub tagline: String,
    pub strengths: Vec<String>,
    pub growth_edges: Vec<String>,
    pub descriptor: String,
}

impl Persona {
    pub fn unknown() -> Self {
        Self {
            tag: "unknown".to_string(),
            title: "Unmapped Profile".to_string(),
            tagline: "Not enough signal yet.".to_string(),
            strengths: vec![],
            growth_edges: vec![],
            descriptor: "This profile could not be matched to a known persona.".to_string(),
        }
    }
}
