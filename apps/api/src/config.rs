use anyhow::{Context, Result};

pub const DEFAULT_REMOTE_MODELS: [&str; 4] = [
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.2-3b-instruct:free",
    "qwen/qwen-2-7b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
];

/// Application configuration loaded from environment variables.
/// Startup aborts if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub cors_origin: String,
    /// Empty disables the remote provider.
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub openrouter_models: Vec<String>,
    pub local_llm_url: String,
    pub local_llm_model: String,
    pub source_timeout_secs: u64,
    pub max_browser_sessions: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8000)?,
            rust_log: optional_env("RUST_LOG", "info"),
            cors_origin: optional_env("CORS_ORIGIN", "http://localhost:3000"),
            openrouter_api_key: optional_env("OPENROUTER_API_KEY", ""),
            openrouter_base_url: optional_env("OPENROUTER_BASE_URL", "https://openrouter.ai/api/v1"),
            openrouter_models: parse_model_list(std::env::var("OPENROUTER_MODELS").ok().as_deref()),
            local_llm_url: optional_env("LOCAL_LLM_URL", "http://localhost:11434"),
            local_llm_model: optional_env("LOCAL_LLM_MODEL", "llama3.2"),
            source_timeout_secs: parse_env("SOURCE_TIMEOUT_SECS", 90)?,
            max_browser_sessions: parse_env("MAX_BROWSER_SESSIONS", 4)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Comma-separated model ids; blank or missing falls back to the defaults.
fn parse_model_list(raw: Option<&str>) -> Vec<String> {
    let models: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();

    if models.is_empty() {
        DEFAULT_REMOTE_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        models
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/jobscout_test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            openrouter_api_key: String::new(),
            openrouter_base_url: "http://127.0.0.1:9/api/v1".to_string(),
            openrouter_models: parse_model_list(None),
            local_llm_url: "http://127.0.0.1:9".to_string(),
            local_llm_model: "llama3.2".to_string(),
            source_timeout_secs: 5,
            max_browser_sessions: 1,
        }
    }
}
