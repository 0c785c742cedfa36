mod calendar;
mod types;

pub use calendar::{day_start, format_wire_date, parse_wire_date};
pub use types::{BatchResponse, StatGroup, StatsRequest};

use crate::error::{SyncError, SyncResult};
use crate::metrics::MetricKind;
use crate::sensor::{SensorDescriptor, SensorId};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use url::Url;

const TAG_LIST_PATH: &str = "ethClient.asmx/GetTagList2";
const MULTI_TAG_STATS_PATH: &str = "ethLogs.asmx/GetMultiTagStatsRaw";
pub const DEFAULT_USER_AGENT: &str = "WirelessTagClient";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub token: String,
    /// Zone the tags record in; used for every calendar date on the wire.
    pub timezone: Tz,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub insecure_skip_verify: bool,
    pub ca_cert_pem: Option<Vec<u8>>,
}

/// Client for the wireless tag cloud API.
#[derive(Clone)]
pub struct WirelessTagClient {
    http: Client,
    base_url: Url,
    token: String,
    timezone: Tz,
}

impl WirelessTagClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let base_url = Url::parse(options.base_url.trim())
            .with_context(|| format!("invalid API url: {}", options.base_url))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            bail!(
                "unsupported protocol scheme: {}, the API url must start with http:// or https://",
                base_url.scheme()
            );
        }

        let user_agent = if options.user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT.to_string()
        } else {
            options.user_agent.trim().to_string()
        };

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(options.insecure_skip_verify);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(pem) = options.ca_cert_pem.as_deref() {
            let cert = reqwest::Certificate::from_pem(pem).context("invalid CA certificate")?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder.build().context("failed to build http client")?;

        Ok(Self {
            http,
            base_url,
            token: options.token,
            timezone: options.timezone,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current tag catalog.
    pub async fn list_sensors(&self) -> SyncResult<Vec<SensorDescriptor>> {
        let body = self.post(TAG_LIST_PATH, b"{}".to_vec()).await?;
        types::decode_tag_list(&body)
    }

    /// One batched stats call for `ids` covering the calendar days of `from`
    /// through `to` in the reference zone. `ids` must be non-empty.
    pub async fn fetch_stats(
        &self,
        ids: &[SensorId],
        kind: MetricKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SyncResult<BatchResponse> {
        let request = StatsRequest {
            ids: ids.to_vec(),
            kind: kind.wire_name(),
            from_date: format_wire_date(from, self.timezone),
            to_date: format_wire_date(to, self.timezone),
        };
        tracing::debug!(
            kind = kind.wire_name(),
            ids = ids.len(),
            from = %request.from_date,
            to = %request.to_date,
            "requesting tag stats"
        );
        let payload = types::encode_stats_request(&request)?;
        let body = self.post(MULTI_TAG_STATS_PATH, payload).await?;
        BatchResponse::decode(&body)
    }

    async fn post(&self, path: &str, payload: Vec<u8>) -> SyncResult<Vec<u8>> {
        let mut url = self.base_url.clone();
        url.set_path(path);

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<types::RemoteFault>(&body) {
                Ok(fault) => fault.message,
                Err(_) => format!("unexpected response status code {}", status.as_u16()),
            };
            return Err(SyncError::Remote { status, message });
        }
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(base_url: &str) -> ClientOptions {
        ClientOptions {
            base_url: base_url.to_string(),
            token: "secret".to_string(),
            timezone: chrono_tz::Pacific::Auckland,
            user_agent: String::new(),
            timeout: None,
            insecure_skip_verify: false,
            ca_cert_pem: None,
        }
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = WirelessTagClient::new(options("ftp://example.com"))
            .err()
            .expect("ftp should be rejected");
        assert!(err.to_string().contains("unsupported protocol scheme: ftp"));
    }

    #[test]
    fn rejects_unparseable_urls() {
        assert!(WirelessTagClient::new(options("not a url")).is_err());
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(WirelessTagClient::new(options("http://127.0.0.1:8080")).is_ok());
        assert!(WirelessTagClient::new(options("https://www.mytaglist.com")).is_ok());
    }
}
