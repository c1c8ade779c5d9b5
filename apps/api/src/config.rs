use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::generation::client::{
    GenerationLimits, DEFAULT_JD_SNIPPET_LIMIT, DEFAULT_RESUME_TEXT_LIMIT,
};
use crate::llm_client::{GeminiSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if the Gemini credential is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub llm_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
    /// Ceiling for uploaded resume files.
    pub max_upload_bytes: usize,
    pub resume_text_limit: usize,
    pub jd_snippet_limit: usize,
    pub max_history_turns: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = var("GEMINI_API_KEY")
            .or_else(|| var("API_KEY"))
            .context("Required environment variable 'GEMINI_API_KEY' is not set")?;

        Ok(Config {
            gemini_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            llm_timeout_secs: parse_or(&var, "LLM_TIMEOUT_SECS", 120)?,
            port: parse_or(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            resume_text_limit: parse_or(&var, "RESUME_TEXT_LIMIT", DEFAULT_RESUME_TEXT_LIMIT)?,
            jd_snippet_limit: parse_or(&var, "JD_SNIPPET_LIMIT", DEFAULT_JD_SNIPPET_LIMIT)?,
            max_history_turns: var("MAX_HISTORY_TURNS")
                .map(|v| parse_value("MAX_HISTORY_TURNS", &v))
                .transpose()?,
        })
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            base_url: self.gemini_base_url.clone(),
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }

    pub fn generation_limits(&self) -> GenerationLimits {
        GenerationLimits {
            match_text_chars: self.resume_text_limit,
            jd_snippet_chars: self.jd_snippet_limit,
            max_history_turns: self.max_history_turns,
        }
    }
}

fn parse_or<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match var(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .ok()
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}
