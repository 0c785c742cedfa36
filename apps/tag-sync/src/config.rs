use crate::wirelesstag::{ClientOptions, DEFAULT_USER_AGENT};
use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://www.mytaglist.com";
const DEFAULT_TIMEZONE: &str = "Pacific/Auckland";
const MAX_LOOKBACK_SECS: u64 = 60 * 60 * 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: String,
    pub timezone: Tz,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub insecure_skip_verify: bool,
    pub ca_cert_path: Option<PathBuf>,

    pub poll_interval_secs: u64,
    pub initial_lookback_secs: u64,
    pub http_bind: String,

    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let api_url = env_string("TAG_SYNC_API_URL", Some(DEFAULT_API_URL.to_string()))?;
        let api_token = env_optional("TAG_SYNC_API_TOKEN")
            .context("TAG_SYNC_API_TOKEN is required")?;
        let timezone = parse_timezone(&env_string(
            "TAG_SYNC_TIMEZONE",
            Some(DEFAULT_TIMEZONE.to_string()),
        )?)?;
        let user_agent = env_string("TAG_SYNC_USER_AGENT", Some(DEFAULT_USER_AGENT.to_string()))?;
        let http_timeout_secs = env_u64("TAG_SYNC_HTTP_TIMEOUT_SECS", Some(0))?;
        let insecure_skip_verify = env_bool("TAG_SYNC_INSECURE_SKIP_VERIFY", false)?;
        let ca_cert_path = env_optional("TAG_SYNC_CA_CERT_PATH").map(PathBuf::from);

        let poll_interval_secs = env_u64("TAG_SYNC_POLL_INTERVAL_SECS", Some(60))?.max(1);
        let initial_lookback_secs = env_u64("TAG_SYNC_INITIAL_LOOKBACK_SECS", Some(3600))?;
        let http_bind = env_string("TAG_SYNC_HTTP_BIND", Some("127.0.0.1:9102".to_string()))?;

        let otlp_endpoint = env_optional("OTEL_EXPORTER_OTLP_ENDPOINT");

        Ok(Self {
            api_url,
            api_token,
            timezone,
            user_agent,
            http_timeout_secs,
            insecure_skip_verify,
            ca_cert_path,
            poll_interval_secs,
            initial_lookback_secs,
            http_bind,
            otlp_endpoint,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn initial_lookback(&self) -> chrono::Duration {
        let secs = self.initial_lookback_secs.min(MAX_LOOKBACK_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    /// Zero disables the client-side deadline.
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }

    pub fn client_options(&self) -> Result<ClientOptions> {
        let ca_cert_pem = match &self.ca_cert_path {
            Some(path) => Some(
                std::fs::read(path)
                    .with_context(|| format!("failed to read CA certificate {}", path.display()))?,
            ),
            None => None,
        };
        Ok(ClientOptions {
            base_url: self.api_url.clone(),
            token: self.api_token.clone(),
            timezone: self.timezone,
            user_agent: self.user_agent.clone(),
            timeout: self.http_timeout(),
            insecure_skip_verify: self.insecure_skip_verify,
            ca_cert_pem,
        })
    }
}

fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|err| anyhow!("invalid TAG_SYNC_TIMEZONE {raw:?}: {err}"))
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64(key: &str, default: Option<u64>) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env_optional(key) {
        Some(value) => parse_bool(&value).ok_or_else(|| anyhow!("invalid {key}: {value}")),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
