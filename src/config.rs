// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Largest PDF accepted for AI extraction.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Character cap on free text excerpts forwarded to the model.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

pub const MIN_GENERATED_QUESTIONS: u32 = 1;
pub const MAX_GENERATED_QUESTIONS: u32 = 20;

pub const MAX_TITLE_CHARS: u64 = 200;
pub const MAX_DESCRIPTION_CHARS: u64 = 2_000;
pub const MAX_QUESTIONS_PER_QUIZ: u64 = 200;

/// Upper bound for `timeLimit`, in minutes.
pub const MAX_TIME_LIMIT_MINUTES: u32 = 24 * 60;

/// Untimed attempts with no saved answers for this long are dropped.
pub const UNTIMED_ATTEMPT_IDLE_MINUTES: u64 = 60;

/// Open attempts one user may hold; starting another evicts their oldest.
pub const MAX_OPEN_ATTEMPTS_PER_USER: usize = 5;

/// Default page size for quiz listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` selects the in-memory document store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub ai_rate_limit: Option<RateLimit>,
}

/// Per-IP quota applied to the AI routes.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub per_second: u64,
    pub burst_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let database_url = optional_var("DATABASE_URL");

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;

        let jwt_expiration = parse_var("JWT_EXPIRATION", 86_400)?;

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = parse_var("PORT", 3000)?;

        let cors_origins = optional_var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let gemini_model = optional_var("GEMINI_MODEL")
            .unwrap_or_else(|| "gemini-1.5-flash".to_string());

        let gemini_base_url = optional_var("GEMINI_BASE_URL")
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string());
        url::Url::parse(&gemini_base_url)
            .map_err(|e| format!("GEMINI_BASE_URL is not a valid URL: {}", e))?;

        let ai_rate_limit = match (
            optional_var("AI_RATE_LIMIT_PER_SECOND"),
            optional_var("AI_RATE_LIMIT_BURST"),
        ) {
            (Some(per_second), Some(burst_size)) => Some(RateLimit {
                per_second: per_second
                    .parse()
                    .map_err(|_| "AI_RATE_LIMIT_PER_SECOND must be a number".to_string())?,
                burst_size: burst_size
                    .parse()
                    .map_err(|_| "AI_RATE_LIMIT_BURST must be a number".to_string())?,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            cors_origins,
            gemini_api_key: optional_var("GEMINI_API_KEY"),
            gemini_model,
            gemini_base_url,
            ai_rate_limit,
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match optional_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
