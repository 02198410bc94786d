use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One per user; upserted on each successful scoring for that user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub current_assessment_id: Uuid,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
