pub mod cache;
pub mod connection_manager;
pub mod llm;
pub mod persona_registry;
pub mod question_bank;
pub mod quota_tracker;
pub mod rate_limiter;
pub mod store;

pub use cache::{Cache, Caches};
pub use connection_manager::ConnectionManager;
pub use persona_registry::PersonaRegistry;
pub use question_bank::QuestionBank;
pub use quota_tracker::QuotaTracker;
pub use rate_limiter::RateLimiter;
pub use store::{Store, StoreTimeouts};
