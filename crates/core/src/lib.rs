pub mod cancel;
pub mod domain;
pub mod history;
pub mod html;
pub mod net;
pub mod present;
pub mod stats;
pub mod table;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_BASE_URL: &str = "https://statusinvest.com.br";
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
    const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub base_url: String,
        pub cookie: Option<String>,
        pub http_timeout: Duration,
        pub poll_interval: Duration,
        pub poll_timeout: Duration,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                base_url: DEFAULT_BASE_URL.to_string(),
                cookie: None,
                http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
                poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
                poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let base_url = std::env::var("CARTEIRA_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

            Ok(Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                cookie: std::env::var("CARTEIRA_COOKIE")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                http_timeout: Duration::from_secs(env_u64(
                    "CARTEIRA_HTTP_TIMEOUT_SECS",
                    DEFAULT_HTTP_TIMEOUT_SECS,
                )?),
                poll_interval: Duration::from_millis(env_u64(
                    "CARTEIRA_POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL_MS,
                )?),
                poll_timeout: Duration::from_secs(env_u64(
                    "CARTEIRA_POLL_TIMEOUT_SECS",
                    DEFAULT_POLL_TIMEOUT_SECS,
                )?),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }
    }

    fn env_u64(key: &str, default: u64) -> anyhow::Result<u64> {
        match std::env::var(key) {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{key} must be a non-negative integer (got {s:?})")),
            _ => Ok(default),
        }
    }
}
