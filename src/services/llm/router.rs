//! Composes the circuit breaker with a provider. Two documented outcomes
//! only: a 200 carrying either the live explanation or the static
//! persona-derived fallback (`is_fallback: true`), or an error when the
//! provider is not configured at all. Ported from
//! `original_source/backend/src/llm/router.py`.

use std::sync::Arc;

use crate::services::llm::circuit_breaker::CircuitBreaker;
use crate::services::llm::provider::{fallback_explanation, DominantInput, ExplanationDto, LlmProvider, ToneProfile};
use crate::utils::error::{ApiError, ApiResult};

pub struct Router {
    provider: Arc<dyn LlmProvider>,
    breaker: CircuitBreaker,
}

impl Router {
    pub fn new(provider: Arc<dyn LlmProvider>, breaker: CircuitBreaker) -> Self {
        Self { provider, breaker }
    }

    pub async fn generate_explanation(
        &self,
        traits: &std::collections::HashMap<String, Option<f64>>,
        facets: &std::collections::HashMap<String, Option<f64>>,
        confidence: f64,
        dominant: &DominantInput,
        tone_profile: Option<&ToneProfile>,
        persona_title: &str,
        tagline: &str,
    ) -> ApiResult<ExplanationDto> {
        if self.breaker.allow_request().await.is_err() {
            tracing::warn!(provider = self.provider.model_name(), "circuit open, serving fallback explanation");
            return Ok(fallback_explanation(persona_title, tagline, self.provider.model_name()));
        }

        if !self.provider.is_configured() {
            return Err(ApiError::service_unavailable("no explanation provider is configured"));
        }

        let result = self.provider.generate_explanation(traits, facets, confidence, dominant, tone_profile).await;

        if result.error.is_some() {
            self.breaker.record_failure().await;
            tracing::warn!(provider = self.provider.model_name(), "provider call failed, serving fallback explanation");
            return Ok(fallback_explanation(persona_title, tagline, self.provider.model_name()));
        }

        self.breaker.record_success().await;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::services::llm::provider::ProviderError;

    struct AlwaysFails;

    #[async_trait]
    impl LlmProvider for AlwaysFails {
        fn model_name(&self) -> &str {
            "test-model"
        }

        async fn generate_content(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::Failure { provider: "test".to_string(), attempts: 1, message: "boom".to_string() })
        }
    }

    #[tokio::test]
    async fn falls_back_when_circuit_is_open() {
        let router = Router::new(Arc::new(AlwaysFails), CircuitBreaker::new("test", 1, Duration::from_secs(60)));
        let traits = std::collections::HashMap::new();
        let facets = std::collections::HashMap::new();
        let dominant = DominantInput { mbti_proxy: "ENFP".to_string(), personality_code: "ENFP-B".to_string() };

        // First call: breaker closed, provider fails, converted to the static fallback.
        let first =
            router.generate_explanation(&traits, &facets, 0.5, &dominant, None, "The Explorer", "curious and bold").await.unwrap();
        assert!(first.is_fallback);

        // Second call: breaker now open, returns the static fallback instead of calling the provider.
        let second =
            router.generate_explanation(&traits, &facets, 0.5, &dominant, None, "The Explorer", "curious and bold").await.unwrap();
        assert!(second.is_fallback);
        assert_eq!(second.persona_title, "The Explorer");
    }

    struct NotConfigured;

    #[async_trait]
    impl LlmProvider for NotConfigured {
        fn model_name(&self) -> &str {
            "test-model"
        }

        fn is_configured(&self) -> bool {
            false
        }

        async fn generate_content(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::NotConfigured)
        }
    }

    #[tokio::test]
    async fn errors_when_provider_is_not_configured() {
        let router = Router::new(Arc::new(NotConfigured), CircuitBreaker::new("test", 3, Duration::from_secs(60)));
        let traits = std::collections::HashMap::new();
        let facets = std::collections::HashMap::new();
        let dominant = DominantInput { mbti_proxy: "ENFP".to_string(), personality_code: "ENFP-B".to_string() };

        let result = router.generate_explanation(&traits, &facets, 0.5, &dominant, None, "The Explorer", "curious and bold").await;
        assert!(result.is_err());
    }
}
