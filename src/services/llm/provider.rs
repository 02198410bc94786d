use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::services::llm::safe_json::safe_load_json;

/// Dominant-profile summary passed into prompt composition.
#[derive(Debug, Clone, Serialize)]
pub struct DominantInput {
    pub mbti_proxy: String,
    pub personality_code: String,
}

/// Optional tone descriptors (style/strengths/cautions) layered onto the
/// user prompt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToneProfile {
    pub style: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub cautions: Option<Vec<String>>,
}

/// Normalized superset DTO returned by every provider, accepting both the
/// new persona-based shape and the legacy shape.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExplanationDto {
    pub persona_title: String,
    pub vibe_summary: String,
    pub strengths: Vec<String>,
    pub growth_edges: Vec<String>,
    pub how_you_show_up: String,
    pub tagline: String,
    pub summary: String,
    pub challenges: Vec<String>,
    pub model_name: String,
    pub tokens_used: Option<i64>,
    pub generation_time_ms: i64,
    pub error: Option<String>,
    pub raw_response: Option<String>,
    pub is_fallback: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no provider configured")]
    NotConfigured,
    #[error("provider {provider} failed after {attempts} attempts: {message}")]
    Failure { provider: String, attempts: u32, message: String },
    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),
}

/// Uniform contract every provider implementation conforms to.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Whether this provider has what it needs to be called at all (e.g.
    /// an API key). Routers use this to short-circuit to an unavailable
    /// response instead of dispatching a call guaranteed to fail.
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate_content(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;

    async fn generate_explanation(
        &self,
        traits: &HashMap<String, Option<f64>>,
        facets: &HashMap<String, Option<f64>>,
        confidence: f64,
        dominant: &DominantInput,
        tone_profile: Option<&ToneProfile>,
    ) -> ExplanationDto {
        let start = std::time::Instant::now();
        let system_prompt = system_prompt();
        let user_prompt = user_prompt(traits, facets, confidence, dominant, tone_profile);

        match self.generate_content(&system_prompt, &user_prompt).await {
            Ok(content) => {
                let generation_time_ms = start.elapsed().as_millis() as i64;
                normalize_response(&content, self.model_name(), generation_time_ms)
            },
            Err(e) => ExplanationDto {
                persona_title: String::new(),
                vibe_summary: String::new(),
                strengths: vec![],
                growth_edges: vec![],
                how_you_show_up: String::new(),
                tagline: String::new(),
                summary: "Unable to generate explanation due to an AI service error.".to_string(),
                challenges: vec![],
                model_name: self.model_name().to_string(),
                tokens_used: None,
                generation_time_ms: start.elapsed().as_millis() as i64,
                error: Some(e.to_string()),
                raw_response: None,
                is_fallback: false,
            },
        }
    }
}

pub fn system_prompt() -> String {
    "You are a personality-insight writer. Respond ONLY with a single JSON object with keys \
     persona_title, vibe_summary, strengths (array of strings), growth_edges (array of strings), \
     how_you_show_up, and tagline. No prose outside the JSON, no markdown fences."
        .to_string()
}

pub fn user_prompt(
    traits: &HashMap<String, Option<f64>>,
    facets: &HashMap<String, Option<f64>>,
    confidence: f64,
    dominant: &DominantInput,
    tone_profile: Option<&ToneProfile>,
) -> String {
    let mut lines = vec![
        format!("MBTI-derived persona: {} ({})", dominant.mbti_proxy, dominant.personality_code),
        format!("Overall confidence: {confidence:.2}"),
        "Trait scores (0-1, null = not enough data):".to_string(),
    ];
    for (name, value) in traits {
        lines.push(format!("- {name}: {}", value.map(|v| format!("{v:.2}")).unwrap_or("null".to_string())));
    }
    let mut top: Vec<(&String, f64)> = facets.iter().filter_map(|(k, v)| v.map(|s| (k, s))).collect();
    top.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    lines.push("Top facets:".to_string());
    for (facet, score) in top.into_iter().take(5) {
        lines.push(format!("- {facet}: {score:.2}"));
    }
    if let Some(tone) = tone_profile {
        if let Some(style) = &tone.style {
            lines.push(format!("Preferred tone: {style}"));
        }
    }
    lines.join("\n")
}

/// Converts raw provider text into the normalized DTO, accepting both the
/// new and legacy JSON shapes and computing backward-compatible aliases.
pub fn normalize_response(content: &str, model_name: &str, generation_time_ms: i64) -> ExplanationDto {
    let parsed = match safe_load_json(content) {
        Ok(v) => v,
        Err(e) => {
            return ExplanationDto {
                persona_title: String::new(),
                vibe_summary: String::new(),
                strengths: vec![],
                growth_edges: vec![],
                how_you_show_up: String::new(),
                tagline: String::new(),
                summary: "Unable to parse LLM response. Please try again.".to_string(),
                challenges: vec![],
                model_name: model_name.to_string(),
                tokens_used: None,
                generation_time_ms,
                error: Some(e.message),
                raw_response: Some(e.raw_excerpt),
                is_fallback: false,
            };
        },
    };

    let get_str = |key: &str| parsed.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    let get_list = |key: &str| -> Vec<String> {
        parsed
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    let mut persona_title = get_str("persona_title");
    let mut vibe_summary = get_str("vibe_summary");
    let mut strengths = get_list("strengths");
    let mut growth_edges = get_list("growth_edges");
    let how_you_show_up = get_str("how_you_show_up");
    let tagline = get_str("tagline");

    if persona_title.is_empty() && vibe_summary.is_empty() {
        // Legacy shape: {summary, strengths, challenges}.
        let summary = get_str("summary");
        let challenges = get_list("challenges");
        if !summary.is_empty() {
            vibe_summary = summary;
        }
        if !challenges.is_empty() {
            growth_edges = challenges;
        }
        persona_title = get_str("persona_title");
    }
    if strengths.is_empty() {
        strengths = get_list("strengths");
    }

    let summary = if how_you_show_up.is_empty() {
        vibe_summary.clone()
    } else {
        format!("{vibe_summary}\n\n{how_you_show_up}")
    };

    ExplanationDto {
        persona_title,
        vibe_summary,
        challenges: growth_edges.clone(),
        strengths,
        growth_edges,
        how_you_show_up,
        tagline,
        summary,
        model_name: model_name.to_string(),
        tokens_used: None,
        generation_time_ms,
        error: None,
        raw_response: None,
        is_fallback: false,
    }
}

/// Static fallback returned when the circuit breaker is open. Must be
/// derivable from already-stored, deterministic data so replay is stable.
pub fn fallback_explanation(persona_title: &str, tagline: &str, model_name: &str) -> ExplanationDto {
    ExplanationDto {
        persona_title: persona_title.to_string(),
        vibe_summary: "We couldn't reach the explanation service right now, but here's your persona."
            .to_string(),
        strengths: vec![],
        growth_edges: vec![],
        how_you_show_up: String::new(),
        tagline: tagline.to_string(),
        summary: "The explanation service is temporarily unavailable.".to_string(),
        challenges: vec![],
        model_name: model_name.to_string(),
        tokens_used: None,
        generation_time_ms: 0,
        error: None,
        raw_response: None,
        is_fallback: true,
    }
}
