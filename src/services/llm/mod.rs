pub mod circuit_breaker;
pub mod gemini_provider;
pub mod provider;
pub mod router;
pub mod safe_json;

pub use provider::{DominantInput, ExplanationDto, LlmProvider, ProviderError, ToneProfile};
pub use router::Router;
