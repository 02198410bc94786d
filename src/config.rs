use std::fs;
use std::path::Path;

use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub request_timeout_secs: u64,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub connection_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub query_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub auth_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expires_in: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub gemini_api_key: String,
    pub default_model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Comma-separated origin list; "*" allows any origin (non-production default).
    pub allowed_origins: String,
}

/// Command line overrides, highest priority in the load chain.
#[derive(Parser, Debug, Clone)]
#[command(name = "personality-engine")]
#[command(version, about = "Personality assessment engine")]
pub struct CommandLineArgs {
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    #[arg(long, value_name = "HOST")]
    pub api_host: Option<String>,

    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    #[arg(long, value_name = "SECRET")]
    pub jwt_secret: Option<String>,

    #[arg(long, value_name = "DURATION")]
    pub jwt_expires_in: Option<String>,

    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub gemini_api_key: Option<String>,

    #[arg(long, value_name = "MODEL")]
    pub default_gemini_model: Option<String>,

    #[arg(long, value_name = "DURATION")]
    pub request_timeout: Option<String>,

    #[arg(long, value_name = "ORIGINS")]
    pub allowed_origins: Option<String>,
}

impl Config {
    /// Loading order (lowest to highest priority): defaults, config.toml,
    /// environment variables, command line arguments.
    pub fn load() -> Result<Self, anyhow::Error> {
        let _ = dotenvy::dotenv();

        let cli_args = CommandLineArgs::parse();

        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(&cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Supported environment variables:
    /// - API_HOST, PORT, REQUEST_TIMEOUT, ENVIRONMENT
    /// - DATABASE_URL, DATABASE_CONNECTION_TIMEOUT, DATABASE_QUERY_TIMEOUT, DATABASE_AUTH_TIMEOUT
    /// - JWT_SECRET, JWT_EXPIRES_IN
    /// - LOG_LEVEL
    /// - GEMINI_API_KEY, DEFAULT_GEMINI_MODEL
    /// - ALLOWED_ORIGINS
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT").and_then(|p| p.parse().map_err(|_| std::env::VarError::NotPresent)) {
            self.server.port = port;
        }
        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT") {
            match parse_duration_to_secs(&timeout) {
                Ok(v) => self.server.request_timeout_secs = v,
                Err(e) => tracing::warn!("invalid REQUEST_TIMEOUT '{timeout}': {e}"),
            }
        }
        if let Ok(env) = std::env::var("ENVIRONMENT") {
            self.server.environment = env;
        }

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            self.database.url = db_url;
        }
        if let Ok(v) = std::env::var("DATABASE_CONNECTION_TIMEOUT") {
            match parse_duration_to_secs(&v) {
                Ok(v) => self.database.connection_timeout_secs = v,
                Err(e) => tracing::warn!("invalid DATABASE_CONNECTION_TIMEOUT '{v}': {e}"),
            }
        }
        if let Ok(v) = std::env::var("DATABASE_QUERY_TIMEOUT") {
            match parse_duration_to_secs(&v) {
                Ok(v) => self.database.query_timeout_secs = v,
                Err(e) => tracing::warn!("invalid DATABASE_QUERY_TIMEOUT '{v}': {e}"),
            }
        }
        if let Ok(v) = std::env::var("DATABASE_AUTH_TIMEOUT") {
            match parse_duration_to_secs(&v) {
                Ok(v) => self.database.auth_timeout_secs = v,
                Err(e) => tracing::warn!("invalid DATABASE_AUTH_TIMEOUT '{v}': {e}"),
            }
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(expires) = std::env::var("JWT_EXPIRES_IN") {
            self.auth.jwt_expires_in = expires;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.llm.gemini_api_key = key;
        }
        if let Ok(model) = std::env::var("DEFAULT_GEMINI_MODEL") {
            self.llm.default_model = model;
        }

        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            self.cors.allowed_origins = origins;
        }
    }

    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(host) = &args.api_host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(db_url) = &args.database_url {
            self.database.url = db_url.clone();
        }
        if let Some(secret) = &args.jwt_secret {
            self.auth.jwt_secret = secret.clone();
        }
        if let Some(expires) = &args.jwt_expires_in {
            self.auth.jwt_expires_in = expires.clone();
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(key) = &args.gemini_api_key {
            self.llm.gemini_api_key = key.clone();
        }
        if let Some(model) = &args.default_gemini_model {
            self.llm.default_model = model.clone();
        }
        if let Some(timeout) = &args.request_timeout {
            match parse_duration_to_secs(timeout) {
                Ok(v) => self.server.request_timeout_secs = v,
                Err(e) => tracing::warn!("invalid --request-timeout '{timeout}': {e}"),
            }
        }
        if let Some(origins) = &args.allowed_origins {
            self.cors.allowed_origins = origins.clone();
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.auth.jwt_secret == "dev-secret-key-change-in-production" {
            tracing::warn!("using default JWT secret, set JWT_SECRET for production");
        }
        if self.server.port == 0 {
            anyhow::bail!("server port cannot be 0");
        }
        if self.database.url.is_empty() {
            anyhow::bail!("database URL cannot be empty");
        }
        if self.llm.gemini_api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY not set, explanation generation will always fall back");
        }
        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let candidates = ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];
        candidates.iter().find(|p| Path::new(p).exists()).map(|p| p.to_string())
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn allowed_origins_list(&self) -> Vec<String> {
        self.cors.allowed_origins.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080, request_timeout_secs: 30, environment: "development".to_string() }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/personality_engine".to_string(),
            connection_timeout_secs: 5,
            query_timeout_secs: 30,
            auth_timeout_secs: 10,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: "dev-secret-key-change-in-production".to_string(), jwt_expires_in: "24h".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,personality_engine=debug".to_string(), file: Some("logs/personality-engine.log".to_string()) }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { gemini_api_key: String::new(), default_model: "gemini-2.0-flash".to_string() }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { allowed_origins: "*".to_string() }
    }
}

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    if let Ok(v) = input.parse::<u64>() {
        return Ok(v);
    }
    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".to_string());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 3600),
        "d" | "day" | "days" => Ok(n * 86_400),
        _ => Err(format!("unsupported unit: {unit}")),
    }
}

fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
        fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(&v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_human_friendly_durations() {
        assert_eq!(parse_duration_to_secs("30s").unwrap(), 30);
        assert_eq!(parse_duration_to_secs("5m").unwrap(), 300);
        assert_eq!(parse_duration_to_secs("1h").unwrap(), 3600);
        assert_eq!(parse_duration_to_secs("42").unwrap(), 42);
    }

    #[test]
    fn splits_allowed_origins() {
        let mut config = Config::default();
        config.cors.allowed_origins = "https://a.com, https://b.com".to_string();
        assert_eq!(config.allowed_origins_list(), vec!["https://a.com", "https://b.com"]);
    }
}
