use serde::Deserialize;

use crate::error::{AppError, AppResult};

pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct ClerkConfig {
    pub webhook_secret: String,
    pub secret_key: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Checked lazily by the connector, which reports its absence.
    pub mongodb_uri: Option<String>,
    pub clerk: ClerkConfig,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        let mongodb_uri = std::env::var("MONGODB_URI").ok().filter(|v| !v.is_empty());
        let clerk = ClerkConfig {
            webhook_secret: required("WEBHOOK_SECRET")?,
            secret_key: required("CLERK_SECRET_KEY")?,
            api_url: std::env::var("CLERK_API_URL")
                .unwrap_or_else(|_| DEFAULT_CLERK_API_URL.into()),
        };
        Ok(Self { mongodb_uri, clerk })
    }
}

fn required(name: &str) -> AppResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Configuration(format!(
            "{name} is missing, add it to .env or the process environment"
        ))),
    }
}
