//! Google Gemini provider. HTTP idiom (reqwest client with a fixed
//! timeout, typed request/response structs, status branching) carried
//! from `services/llm/client.rs`; retry schedule and model fallback
//! ported from `original_source/backend/src/llm/gemini_provider.py`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::services::llm::provider::{LlmProvider, ProviderError};

const BACKOFF_SCHEDULE_SECS: [f64; 5] = [0.5, 1.0, 2.0, 4.0, 8.0];
const MAX_RETRIES: u32 = 5;

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    primary_model: String,
    alternate_models: Vec<String>,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, primary_model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("reqwest client"),
            api_key: api_key.into(),
            primary_model: primary_model.into(),
            alternate_models: vec!["gemini-2.0-flash-exp".to_string()],
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={}",
            self.api_key
        )
    }

    async fn try_model(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
            generation_config: GenerationConfig { temperature: 0.7 },
        };

        let mut last_error = String::new();
        for attempt in 0..MAX_RETRIES {
            let response = self.http.post(self.endpoint(model)).json(&body).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: GenerateContentResponse = resp
                        .json()
                        .await
                        .map_err(|e| ProviderError::Failure {
                            provider: "gemini".to_string(),
                            attempts: attempt + 1,
                            message: format!("invalid response body: {e}"),
                        })?;
                    let text = parsed
                        .candidates
                        .first()
                        .and_then(|c| c.content.parts.first())
                        .map(|p| p.text.clone())
                        .unwrap_or_default();
                    return Ok(text);
                },
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    last_error = format!("{status}: {text}");
                    if status.as_u16() == 429 || text.to_lowercase().contains("quota") {
                        let wait = BACKOFF_SCHEDULE_SECS[attempt as usize] * 2.0;
                        tokio::time::sleep(std::time::Duration::from_secs_f64(wait)).await;
                        continue;
                    }
                    if status.as_u16() == 401 || status.as_u16() == 403 {
                        // Non-retriable: key misconfiguration / permission error.
                        return Err(ProviderError::Failure {
                            provider: "gemini".to_string(),
                            attempts: attempt + 1,
                            message: last_error,
                        });
                    }
                    if attempt + 1 < MAX_RETRIES {
                        tokio::time::sleep(std::time::Duration::from_secs_f64(
                            BACKOFF_SCHEDULE_SECS[attempt as usize],
                        ))
                        .await;
                    }
                },
                Err(e) => {
                    last_error = e.to_string();
                    if attempt + 1 < MAX_RETRIES {
                        tokio::time::sleep(std::time::Duration::from_secs_f64(
                            BACKOFF_SCHEDULE_SECS[attempt as usize],
                        ))
                        .await;
                    }
                },
            }
        }

        Err(ProviderError::Failure {
            provider: "gemini".to_string(),
            attempts: MAX_RETRIES,
            message: last_error,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.primary_model
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate_content(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured);
        }

        let full_prompt = format!("{system_prompt}\n\n{user_prompt}");
        let models_to_try: Vec<&str> =
            std::iter::once(self.primary_model.as_str()).chain(self.alternate_models.iter().map(String::as_str)).collect();

        let mut last_err = None;
        for model in models_to_try {
            match self.try_model(model, &full_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(model, error = %e, "gemini model failed, trying next alternate");
                    last_err = Some(e);
                },
            }
        }
        Err(last_err.unwrap_or(ProviderError::NotConfigured))
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}
