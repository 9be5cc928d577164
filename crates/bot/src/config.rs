use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_INSTRUCTIONS_PATH: &str = "instructions.md";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

pub struct Config {
    /// The one mandatory credential; startup aborts without it.
    pub telegram_token: String,
    pub model: String,
    pub instructions_path: PathBuf,
    pub log_webhook_url: Option<String>,
    /// Empty means open access.
    pub allowed_user_ids: Vec<i64>,
    pub poll_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let telegram_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;

        let model = env::var("GEN_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let instructions_path = env::var("INSTRUCTIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_INSTRUCTIONS_PATH));
        let log_webhook_url = env::var("LOG_WEBHOOK_URL").ok().filter(|u| !u.trim().is_empty());
        let allowed_user_ids = parse_id_list(&env::var("ALLOWED_USER_IDS").unwrap_or_default());
        let poll_timeout_secs = env::var("POLL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);

        Ok(Self {
            telegram_token,
            model,
            instructions_path,
            log_webhook_url,
            allowed_user_ids,
            poll_timeout_secs,
        })
    }
}

fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = s, "ignoring malformed entry in ALLOWED_USER_IDS");
                None
            }
        })
        .collect()
}
