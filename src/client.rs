use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::error::Result;

const API_BASE: &str = "https://connectapi.garmin.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The authenticated Garmin Connect API surface the fetchers run against.
///
/// `connectapi` returns `None` when the service answers with no body, so
/// callers can distinguish "no data for this day" from a malformed payload.
#[async_trait]
pub trait ApiClient: Send + Sync {
    fn username(&self) -> &str;

    async fn connectapi(&self, path: &str) -> Result<Option<Value>>;
}

pub struct GarminClient {
    http: reqwest::Client,
    username: String,
    token: String,
}

impl GarminClient {
    /// Builds a client around an already-obtained OAuth bearer token.
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            username: username.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl ApiClient for GarminClient {
    fn username(&self) -> &str {
        &self.username
    }

    async fn connectapi(&self, path: &str) -> Result<Option<Value>> {
        let url = format!("{API_BASE}{path}");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?
            .error_for_status()?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&body)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}
