use std::env;

use anyhow::Context;

/// Keys shorter than this are treated as placeholders and leave the model disabled.
const MIN_API_KEY_LEN: usize = 11;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,

    pub claude_api_key: String,
    pub claude_model: String,
    pub generation_timeout_secs: u64,

    pub report_daily_quota: i64,
    pub report_scheduler_enabled: bool,
    pub report_schedule_hour_utc: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            claude_api_key: env::var("CLAUDE_API_KEY").unwrap_or_default(),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".into()),
            generation_timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .context("GENERATION_TIMEOUT_SECS must be a number")?,

            report_daily_quota: env::var("REPORT_DAILY_QUOTA")
                .unwrap_or_else(|_| "3".into())
                .parse()
                .unwrap_or(3),
            report_scheduler_enabled: env::var("REPORT_SCHEDULER_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            report_schedule_hour_utc: env::var("REPORT_SCHEDULE_HOUR_UTC")
                .unwrap_or_else(|_| "20".into()) // Sunday 20:00
                .parse()
                .unwrap_or(20),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The model API key, if one that looks real is configured.
    pub fn generation_api_key(&self) -> Option<&str> {
        let key = self.claude_api_key.trim();
        (key.len() >= MIN_API_KEY_LEN).then_some(key)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/moodarc_test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret-please-ignore".into(),
            claude_api_key: String::new(),
            claude_model: "claude-test".into(),
            generation_timeout_secs: 5,
            report_daily_quota: 3,
            report_scheduler_enabled: false,
            report_schedule_hour_utc: 20,
        }
    }
}
