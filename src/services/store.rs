//! Postgres-backed persistence. Query/transaction idiom carried from
//! `services/user_service.rs` (query_as against typed row structs,
//! `pool.begin()` for multi-statement writes); retry/timeout wrapping
//! ported from `original_source/backend/src/db/store.py`'s
//! transient-error classifier.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bcrypt::{hash, verify, DEFAULT_COST};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Assessment, AssessmentScores, AssessmentSummary, CanonicalAssessmentResponse, CanonicalMetadata,
    DominantInfo, Explanation, HistoryEntry, PagedHistory, Profile, ResponseSet, ScoringResult, SessionInfo,
};
use crate::services::cache::Caches;
use crate::services::llm::ExplanationDto;
use crate::utils::error::{ApiError, ApiResult};
use crate::utils::jwt::JwtUtil;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_SECS: [u64; 3] = [1, 2, 4];

/// Store-level timeout budgets, independent of the global request
/// timeout imposed by the HTTP middleware layer.
#[derive(Debug, Clone, Copy)]
pub struct StoreTimeouts {
    pub query: Duration,
    pub auth: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self { query: Duration::from_secs(30), auth: Duration::from_secs(10) }
    }
}

pub struct Store {
    pool: PgPool,
    jwt: Arc<JwtUtil>,
    caches: Arc<Caches>,
    timeouts: StoreTimeouts,
}

impl Store {
    pub fn new(pool: PgPool, jwt: Arc<JwtUtil>, caches: Arc<Caches>, timeouts: StoreTimeouts) -> Self {
        Self { pool, jwt, caches, timeouts }
    }

    // ---- assessments ----------------------------------------------------

    pub async fn create_assessment(
        &self,
        user_id: Option<Uuid>,
        responses: &ResponseSet,
        scoring: &ScoringResult,
    ) -> ApiResult<Assessment> {
        let metadata = serde_json::to_value(&scoring.metadata)?;

        // A profile scored with missing trait coverage is flagged for
        // retake at insert time; nothing clears the flag afterward, a
        // retake always creates a new row rather than mutating this one.
        let needs_retake = !scoring.has_complete_profile;

        self.with_retry("create_assessment", self.timeouts.query, || async {
            sqlx::query_as::<_, Assessment>(
                r#"
                INSERT INTO assessments
                    (user_id, quiz_type, raw_responses, trait_scores, facet_scores,
                     mbti_code, persona_id, confidence, scoring_version, metadata, needs_retake)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(&scoring.metadata.quiz_type)
            .bind(sqlx::types::Json(responses))
            .bind(sqlx::types::Json(&scoring.traits))
            .bind(sqlx::types::Json(&scoring.facets))
            .bind(&scoring.mbti_proxy)
            .bind(&scoring.persona_id)
            .bind(scoring.confidence)
            .bind(&scoring.metadata.scoring_version)
            .bind(sqlx::types::Json(&metadata))
            .bind(needs_retake)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::from)
        })
        .await
    }

    pub async fn save_explanation(&self, assessment_id: Uuid, dto: &ExplanationDto) -> ApiResult<Explanation> {
        let explanation = self
            .with_retry("save_explanation", self.timeouts.query, || async {
                sqlx::query_as::<_, Explanation>(
                    r#"
                    INSERT INTO explanations
                        (assessment_id, persona_title, vibe_summary, strengths, growth_edges,
                         how_you_show_up, tagline, model_name, tokens_used, generation_time_ms,
                         error, raw_response, is_fallback)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    ON CONFLICT (assessment_id) DO UPDATE SET
                        persona_title = excluded.persona_title,
                        vibe_summary = excluded.vibe_summary,
                        strengths = excluded.strengths,
                        growth_edges = excluded.growth_edges,
                        how_you_show_up = excluded.how_you_show_up,
                        tagline = excluded.tagline,
                        model_name = excluded.model_name,
                        tokens_used = excluded.tokens_used,
                        generation_time_ms = excluded.generation_time_ms,
                        error = excluded.error,
                        raw_response = excluded.raw_response,
                        is_fallback = excluded.is_fallback
                    RETURNING *
                    "#,
                )
                .bind(assessment_id)
                .bind(&dto.persona_title)
                .bind(&dto.vibe_summary)
                .bind(sqlx::types::Json(&dto.strengths))
                .bind(sqlx::types::Json(&dto.growth_edges))
                .bind(&dto.how_you_show_up)
                .bind(&dto.tagline)
                .bind(&dto.model_name)
                .bind(dto.tokens_used)
                .bind(dto.generation_time_ms)
                .bind(&dto.error)
                .bind(&dto.raw_response)
                .bind(dto.is_fallback)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::from)
            })
            .await?;

        self.caches.assessment.invalidate_containing(&assessment_id.to_string());
        Ok(explanation)
    }

    pub async fn get_assessment(&self, id: Uuid) -> ApiResult<AssessmentSummary> {
        let cache_key = format!("assessment:{id}");
        if let Some(cached) = self.caches.assessment.get(&cache_key) {
            return Ok(serde_json::from_value(cached)?);
        }

        let summary = self
            .with_retry("get_assessment", self.timeouts.query, || async {
                sqlx::query_as::<_, AssessmentSummary>(
                    r#"
                    SELECT id, created_at, trait_scores, facet_scores, mbti_code, persona_id,
                           confidence, metadata, scoring_version, quiz_type
                    FROM assessments WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::not_found(format!("assessment {id} not found")))
            })
            .await?;

        self.caches.assessment.insert(cache_key, serde_json::to_value(&summary)?);
        Ok(summary)
    }

    pub async fn get_assessment_full(&self, id: Uuid) -> ApiResult<Assessment> {
        self.with_retry("get_assessment_full", self.timeouts.query, || async {
            sqlx::query_as::<_, Assessment>("SELECT * FROM assessments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::not_found(format!("assessment {id} not found")))
        })
        .await
    }

    /// Scores-only projection, uncached — callers that just need the
    /// numbers (e.g. comparison across assessments) skip the metadata
    /// and raw-response payload `get_assessment` carries.
    pub async fn get_assessment_scores(&self, id: Uuid) -> ApiResult<AssessmentScores> {
        self.with_retry("get_assessment_scores", self.timeouts.query, || async {
            sqlx::query_as::<_, AssessmentScores>(
                "SELECT id, trait_scores, facet_scores, mbti_code, confidence FROM assessments WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::not_found(format!("assessment {id} not found")))
        })
        .await
    }

    pub async fn get_explanation(&self, assessment_id: Uuid) -> ApiResult<Option<Explanation>> {
        self.with_retry("get_explanation", self.timeouts.query, || async {
            sqlx::query_as::<_, Explanation>("SELECT * FROM explanations WHERE assessment_id = $1")
                .bind(assessment_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::from)
        })
        .await
    }

    pub async fn get_history(&self, user_id: Uuid, page: i64, page_size: i64) -> ApiResult<PagedHistory> {
        let cache_key = format!("history:{user_id}:{page}:{page_size}");
        if let Some(cached) = self.caches.history.get(&cache_key) {
            return Ok(serde_json::from_value(cached)?);
        }

        let offset = (page - 1) * page_size;
        let (items, total) = self
            .with_retry("get_history", self.timeouts.query, || async {
                let items: Vec<HistoryEntry> = sqlx::query_as(
                    r#"
                    SELECT id, created_at, quiz_type, mbti_code, persona_id, confidence
                    FROM assessments
                    WHERE user_id = $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(user_id)
                .bind(page_size)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(ApiError::from)?;

                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(ApiError::from)?;

                Ok::<_, ApiError>((items, total))
            })
            .await?;

        let paged = PagedHistory { items, page: page as u32, page_size: page_size as u32, total };
        self.caches.history.insert(cache_key, serde_json::to_value(&paged)?);
        Ok(paged)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> ApiResult<Profile> {
        self.with_retry("get_profile", self.timeouts.query, || async {
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| ApiError::not_found(format!("no profile for user {user_id}")))
        })
        .await
    }

    pub async fn upsert_profile(&self, user_id: Uuid, assessment_id: Uuid) -> ApiResult<Profile> {
        let profile = self
            .with_retry("upsert_profile", self.timeouts.query, || async {
                sqlx::query_as::<_, Profile>(
                    r#"
                    INSERT INTO profiles (user_id, current_assessment_id, updated_at)
                    VALUES ($1, $2, now())
                    ON CONFLICT (user_id) DO UPDATE SET
                        current_assessment_id = excluded.current_assessment_id,
                        updated_at = now()
                    RETURNING *
                    "#,
                )
                .bind(user_id)
                .bind(assessment_id)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::from)
            })
            .await?;

        self.caches.history.invalidate_containing(&user_id.to_string());
        Ok(profile)
    }

    /// Assembles the canonical wire response from a freshly scored
    /// assessment, without a further round trip to the database.
    pub fn canonical_response(assessment_id: Uuid, scoring: &ScoringResult) -> CanonicalAssessmentResponse {
        CanonicalAssessmentResponse {
            assessment_id,
            ocean: scoring.ocean.clone(),
            persona_id: scoring.persona_id.clone(),
            mbti_proxy: scoring.mbti_proxy.clone(),
            confidence: scoring.confidence,
            metadata: CanonicalMetadata {
                quiz_type: scoring.metadata.quiz_type.clone(),
                engine_version: scoring.metadata.engine_version.clone(),
                scoring_version: scoring.metadata.scoring_version.clone(),
                timestamp: scoring.metadata.timestamp,
            },
            traits: scoring.traits.clone(),
            facets: scoring.facets.clone(),
            dominant: DominantInfo {
                mbti_proxy: scoring.mbti_proxy.clone(),
                personality_code: scoring.personality_code.clone(),
            },
            is_complete: scoring.has_complete_profile,
            traits_with_data: scoring.traits_with_data.clone(),
        }
    }

    // ---- auth -------------------------------------------------------------

    /// Generic failure message on every path (no user enumeration): a
    /// duplicate email and an internal error are indistinguishable to
    /// the caller beyond the 422/500 status split.
    pub async fn sign_up(&self, email: &str, password: &str, profile_id: &str) -> ApiResult<Uuid> {
        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| ApiError::internal_error(format!("failed to hash password: {e}")))?;

        self.with_retry("sign_up", self.timeouts.auth, || async {
            let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::from)?;
            if existing.is_some() {
                return Err(ApiError::validation_error("an account with this email already exists"));
            }

            let (id,): (Uuid,) = sqlx::query_as(
                "INSERT INTO users (email, password_hash, profile_id) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(email)
            .bind(&password_hash)
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::from)?;

            Ok(id)
        })
        .await
    }

    pub async fn sign_in(&self, identifier: &str, password: &str) -> ApiResult<SessionInfo> {
        let row: Option<(Uuid, String, String)> = self
            .with_retry("sign_in", self.timeouts.auth, || async {
                sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = $1")
                    .bind(identifier)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(ApiError::from)
            })
            .await?;

        let (user_id, email, password_hash) = row.ok_or_else(ApiError::unauthorized)?;

        let matches = verify(password, &password_hash)
            .map_err(|e| ApiError::internal_error(format!("password verification failed: {e}")))?;
        if !matches {
            return Err(ApiError::unauthorized());
        }

        let access_token = self.jwt.generate_token(&user_id.to_string(), &email)?;
        Ok(SessionInfo { access_token, token_type: "bearer".to_string(), expires_in: 86_400 })
    }

    pub async fn reset_password(&self, email: &str) -> ApiResult<()> {
        // Always succeeds from the caller's perspective whether or not the
        // account exists, to avoid leaking account existence.
        let user: Option<(Uuid,)> = self
            .with_retry("reset_password_lookup", self.timeouts.auth, || async {
                sqlx::query_as("SELECT id FROM users WHERE email = $1")
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(ApiError::from)
            })
            .await?;

        if let Some((user_id,)) = user {
            let token = Uuid::new_v4().to_string();
            self.with_retry("reset_password_insert", self.timeouts.auth, || async {
                sqlx::query(
                    "INSERT INTO password_resets (user_id, token, expires_at) VALUES ($1, $2, now() + interval '1 hour')",
                )
                .bind(user_id)
                .bind(&token)
                .execute(&self.pool)
                .await
                .map_err(ApiError::from)
            })
            .await?;
        }

        Ok(())
    }

    pub async fn update_password(&self, user_id: Uuid, new_password: &str) -> ApiResult<()> {
        let password_hash = hash(new_password, DEFAULT_COST)
            .map_err(|e| ApiError::internal_error(format!("failed to hash password: {e}")))?;

        self.with_retry("update_password", self.timeouts.auth, || async {
            sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
                .bind(&password_hash)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(ApiError::from)
        })
        .await?;

        Ok(())
    }

    /// Stateless session revocation is a no-op server-side: bearer tokens
    /// are self-verifying JWTs with no server-side session table to clear.
    pub async fn sign_out(&self) -> ApiResult<()> {
        Ok(())
    }

    // ---- retry/timeout plumbing --------------------------------------------

    async fn with_retry<T, F, Fut>(&self, op: &str, timeout: Duration, mut f: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match tokio::time::timeout(timeout, f()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if is_transient(&e) && attempt + 1 < MAX_ATTEMPTS => {
                    tracing::warn!(op, attempt, error = %e, "transient store error, retrying");
                    tokio::time::sleep(Duration::from_secs(RETRY_BACKOFF_SECS[attempt as usize])).await;
                    last_err = Some(e);
                },
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    tracing::warn!(op, attempt, "store operation timed out");
                    last_err = Some(ApiError::Timeout);
                    if attempt + 1 >= MAX_ATTEMPTS {
                        break;
                    }
                    tokio::time::sleep(Duration::from_secs(RETRY_BACKOFF_SECS[attempt as usize])).await;
                },
            }
        }
        Err(last_err.unwrap_or_else(|| ApiError::internal_error(format!("{op} failed with no recorded error"))))
    }
}

/// Transient-error substring classifier: connection churn and lock
/// contention are worth a retry, constraint/validation failures are not.
fn is_transient(err: &ApiError) -> bool {
    let message = err.to_string().to_lowercase();
    matches!(err, ApiError::Timeout)
        || [
            "connection",
            "timed out",
            "timeout",
            "deadlock",
            "too many connections",
            "broken pipe",
            "temporarily unavailable",
            "rate limit",
        ]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_connection_errors_as_transient() {
        assert!(is_transient(&ApiError::internal_error("connection reset by peer")));
        assert!(is_transient(&ApiError::Timeout));
    }

    #[test]
    fn classifies_validation_errors_as_permanent() {
        assert!(!is_transient(&ApiError::validation_error("email already registered")));
        assert!(!is_transient(&ApiError::NotFound("x".to_string())));
    }
}
