use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Service configuration loaded explicitly from environment variables.
///
/// The chat-service credential lives in `report_common::openai::OpenAiClientConfig`;
/// everything here has a default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one `<industry>.docx` report per industry.
    pub report_dir: PathBuf,
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    /// Chat model used for summaries.
    pub model: String,
    /// Answer length stated in each summarization prompt.
    pub summary_max_tokens: u32,
    /// Upper bound for a single summarization call.
    pub summary_timeout: Duration,
    /// Allowed CORS origins; `None` allows any origin.
    pub cors_allow_origins: Option<Vec<String>>,
}

impl Config {
    /// Optional:
    /// - `REPORT_DIR` (default `app`)
    /// - `LISTEN_ADDR`, else `0.0.0.0:$PORT`, else `0.0.0.0:8000`
    /// - `OPENAI_MODEL` (default `gpt-3.5-turbo`)
    /// - `SUMMARY_MAX_TOKENS` (default 50)
    /// - `SUMMARY_TIMEOUT_SECS` (default 60)
    /// - `CORS_ALLOW_ORIGINS`: comma-separated origins, `*` for any (default `*`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let report_dir = PathBuf::from(lookup("REPORT_DIR").unwrap_or_else(|| "app".to_string()));

        let listen_addr = match (lookup("LISTEN_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => format!("0.0.0.0:{}", port.trim()),
            (None, None) => "0.0.0.0:8000".to_string(),
        };
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|_| AppError::Config(format!("invalid listen address: {listen_addr}")))?;

        let model = lookup("OPENAI_MODEL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "gpt-3.5-turbo".to_string());

        let summary_max_tokens = match lookup("SUMMARY_MAX_TOKENS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| AppError::Config(format!("invalid SUMMARY_MAX_TOKENS: {raw}")))?,
            None => 50,
        };

        let summary_timeout = match lookup("SUMMARY_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|&n| n > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    AppError::Config(format!("invalid SUMMARY_TIMEOUT_SECS: {raw}"))
                })?,
            None => Duration::from_secs(60),
        };

        let cors_allow_origins = lookup("CORS_ALLOW_ORIGINS").and_then(|raw| {
            let origins: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if origins.is_empty() || origins.iter().any(|o| o == "*") {
                None
            } else {
                Some(origins)
            }
        });

        Ok(Self {
            report_dir,
            listen_addr,
            model,
            summary_max_tokens,
            summary_timeout,
            cors_allow_origins,
        })
    }
}
