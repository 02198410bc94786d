//! Personality assessment engine library.
//!
//! Houses every module for the HTTP service: scoring, persona mapping,
//! persistence, the LLM explanation pipeline, and the axum handler/
//! middleware layer that exposes them.

use std::sync::Arc;

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod scorer;
pub mod services;
pub mod utils;
pub mod validators;

pub use config::Config;
pub use observability::AppMetrics;
pub use scorer::Scorer;
pub use services::llm::Router as LlmRouter;
pub use services::{Cache, Caches, ConnectionManager, PersonaRegistry, QuestionBank, QuotaTracker, RateLimiter, Store};
pub use utils::jwt::JwtUtil;

/// Process-wide shared state. Rust's type system is the DI container:
/// every service is wrapped in `Arc` for cheap cloning into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub question_bank: Arc<QuestionBank>,
    pub persona_registry: Arc<PersonaRegistry>,
    pub connection_manager: Arc<ConnectionManager>,
    pub store: Arc<Store>,
    pub caches: Arc<Caches>,
    pub quota_tracker: Arc<QuotaTracker>,
    pub rate_limiter: Arc<RateLimiter>,
    pub llm_router: Arc<LlmRouter>,
    pub jwt_util: Arc<JwtUtil>,
    pub metrics: Arc<AppMetrics>,
}
