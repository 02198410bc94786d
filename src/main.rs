use std::sync::Arc;
use std::time::Duration;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use personality_engine::config::Config;
use personality_engine::models;
use personality_engine::services::llm::gemini_provider::GeminiProvider;
use personality_engine::services::llm::circuit_breaker::CircuitBreaker;
use personality_engine::services::{Caches, ConnectionManager, PersonaRegistry, QuestionBank, QuotaTracker, RateLimiter, Store, StoreTimeouts};
use personality_engine::{handlers, middleware, AppMetrics, AppState, JwtUtil, LlmRouter};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::root,
        handlers::health::health,
        handlers::health::metrics,
        handlers::questions::list_questions,
        handlers::assessments::create_assessment,
        handlers::assessments::get_assessment,
        handlers::assessments::generate_explanation,
        handlers::assessments::sync_assessments,
        handlers::assessments::get_history,
        handlers::profiles::get_profile,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::reset_password,
        handlers::auth::update_password,
        handlers::auth::logout,
    ),
    components(schemas(
        handlers::health::RootResponse,
        handlers::health::HealthResponse,
        handlers::health::DatabaseHealth,
        handlers::health::MetricsResponse,
        handlers::health::CacheSizes,
        handlers::questions::QuestionListResponse,
        models::Question,
        models::Trait,
        models::CreateAssessmentRequest,
        models::CanonicalAssessmentResponse,
        models::CanonicalMetadata,
        models::DominantInfo,
        models::Ocean,
        models::PagedHistory,
        models::HistoryEntry,
        models::Profile,
        models::SignupRequest,
        models::SignupResponse,
        models::LoginRequest,
        models::LoginResponse,
        models::SessionInfo,
        models::ResetPasswordRequest,
        models::UpdatePasswordRequest,
        models::MessageResponse,
        personality_engine::services::llm::ExplanationDto,
        handlers::assessments::SyncAssessmentsRequest,
        handlers::assessments::SyncAssessmentsResponse,
        handlers::assessments::SyncItemResult,
    )),
    tags(
        (name = "Observability", description = "Liveness, readiness, and in-process metrics"),
        (name = "Questions", description = "Question catalog"),
        (name = "Assessments", description = "Scoring, retrieval, explanation, sync, history"),
        (name = "Profiles", description = "Per-user latest-assessment pointer"),
        (name = "Auth", description = "Signup, login, password reset, session"),
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path.file_name().and_then(|n| n.to_str()).unwrap_or("personality-engine.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("personality-engine starting up");
    tracing::info!("configuration loaded successfully");

    let connection_manager = Arc::new(ConnectionManager::new());
    connection_manager.initialize(&config.database.url, config.database.connection_timeout_secs).await?;
    let pool = connection_manager.get_client().await?;
    tracing::info!("database pool created successfully");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("migrations applied");

    let jwt_util = Arc::new(JwtUtil::new(&config.auth.jwt_secret, &config.auth.jwt_expires_in));
    let question_bank = Arc::new(QuestionBank::load()?);
    let persona_registry = Arc::new(PersonaRegistry::load()?);
    let caches = Arc::new(Caches::new());
    let quota_tracker = Arc::new(QuotaTracker::default());
    let rate_limiter = Arc::new(RateLimiter::new());
    let metrics = Arc::new(AppMetrics::new());

    let store_timeouts = StoreTimeouts {
        query: Duration::from_secs(config.database.query_timeout_secs),
        auth: Duration::from_secs(config.database.auth_timeout_secs),
    };
    let store = Arc::new(Store::new(pool.clone(), Arc::clone(&jwt_util), Arc::clone(&caches), store_timeouts));

    let gemini = GeminiProvider::new(config.llm.gemini_api_key.clone(), config.llm.default_model.clone());
    let breaker = CircuitBreaker::new("gemini", 3, Duration::from_secs(60));
    let llm_router = Arc::new(LlmRouter::new(Arc::new(gemini), breaker));

    let app_state = AppState {
        config: Arc::new(config.clone()),
        question_bank,
        persona_registry,
        connection_manager: Arc::clone(&connection_manager),
        store,
        caches,
        quota_tracker,
        rate_limiter,
        llm_router,
        jwt_util,
        metrics,
    };

    let observability_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/metrics", get(handlers::health::metrics));

    let public_routes = Router::new()
        .route("/v1/questions", get(handlers::questions::list_questions))
        .route("/v1/assessments", post(handlers::assessments::create_assessment))
        .route("/v1/assessments/sync", post(handlers::assessments::sync_assessments))
        .route("/v1/assessments/:id", get(handlers::assessments::get_assessment))
        .route("/v1/assessments/:id/generate_explanation", post(handlers::assessments::generate_explanation))
        .route("/v1/assessments/:user_id/history", get(handlers::assessments::get_history))
        .route("/v1/profiles/:user_id", get(handlers::profiles::get_profile))
        .route("/v1/auth/signup", post(handlers::auth::signup))
        .route("/v1/auth/login", post(handlers::auth::login))
        .route("/v1/auth/reset-password", post(handlers::auth::reset_password));

    let protected_routes = Router::new()
        .route("/v1/auth/update-password", post(handlers::auth::update_password))
        .route("/v1/auth/logout", post(handlers::auth::logout))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), middleware::auth_middleware));

    let cors = build_cors_layer(&config.server.environment, &config.allowed_origins_list());

    let app = Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(observability_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state.clone())
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), middleware::metrics_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower::timeout::TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(cors);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("server listening on http://{addr}");
    tracing::info!("api documentation available at http://{addr}/api-docs");
    tracing::info!("personality-engine is ready to serve requests");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Permissive in the `development` environment, or when the configured
/// origin list is the `"*"` default; otherwise restricted to the parsed
/// `ALLOWED_ORIGINS` list.
fn build_cors_layer(environment: &str, origins: &[String]) -> tower_http::cors::CorsLayer {
    if environment == "development" || origins.iter().any(|o| o == "*") {
        return tower_http::cors::CorsLayer::permissive();
    }

    let parsed: Vec<axum::http::HeaderValue> =
        origins.iter().filter_map(|o| axum::http::HeaderValue::from_str(o).ok()).collect();

    tower_http::cors::CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
