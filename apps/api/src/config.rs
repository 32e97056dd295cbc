use anyhow::{bail, Context, Result};

use crate::llm_client::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::screening::router::LabelMatching;

/// 20 MiB: room for image-heavy PDFs.
const DEFAULT_MAX_UPLOAD_BYTES: &str = "20971520";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub llm_backoff_ms: u64,
    pub max_upload_bytes: usize,
    pub frontend_origin: String,
    pub label_matching: LabelMatching,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            groq_api_key: require_env("GROQ_API_KEY")?,
            llm_api_url: optional_env("LLM_API_URL", DEFAULT_API_URL),
            llm_model: optional_env("LLM_MODEL", DEFAULT_MODEL),
            llm_timeout_secs: optional_env("LLM_TIMEOUT_SECS", "120")
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            llm_max_retries: optional_env("LLM_MAX_RETRIES", "0")
                .parse::<u32>()
                .context("LLM_MAX_RETRIES must be a non-negative integer")?,
            llm_backoff_ms: optional_env("LLM_BACKOFF_MS", "1000")
                .parse::<u64>()
                .context("LLM_BACKOFF_MS must be a whole number of milliseconds")?,
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a whole number of bytes")?,
            frontend_origin: optional_env("FRONTEND_ORIGIN", "http://localhost:8080"),
            label_matching: parse_label_matching(&optional_env("LABEL_MATCHING", "strict"))?,
            port: optional_env("PORT", "8000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_label_matching(value: &str) -> Result<LabelMatching> {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(LabelMatching::Strict),
        "tolerant" => Ok(LabelMatching::Tolerant),
        other => bail!("LABEL_MATCHING must be 'strict' or 'tolerant', got '{other}'"),
    }
}
