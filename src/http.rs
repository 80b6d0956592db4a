use reqwest::header::{CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::constants::{BASE_URL, USER_AGENT_NAME, VERSION};
use crate::error::{BotBlockError, RateLimit, Result};
use crate::models::BotId;

/// Shared HTTP plumbing for the aggregator and the directories.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl RequestHandler {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self::with_base_url(user_agent, BASE_URL)
    }

    /// Points the handler at another aggregator root (a proxy or a mock server).
    pub fn with_base_url(user_agent: impl Into<String>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            client: Client::new(),
            base_url,
            user_agent: user_agent.into(),
        }
    }

    /// Handler with the default user agent for the given bot.
    pub fn for_bot(id: impl Into<BotId>) -> Self {
        Self::new(default_user_agent(&id.into()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub(crate) fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| unreachable(url, e))?;

        let body = read_body(url, response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B, timeout: Duration) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {} (timeout {:?})", url, timeout);

        let payload = serde_json::to_vec(body)?;
        let response = self
            .client
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .body(payload)
            .send()
            .await
            .map_err(|e| unreachable(url, e))?;

        let body = read_body(url, response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

pub fn default_user_agent(id: &BotId) -> String {
    format!("{USER_AGENT_NAME}/{VERSION} (Unknown; +https://botblock.org) DBots/{id}")
}

fn unreachable(url: &str, err: reqwest::Error) -> BotBlockError {
    BotBlockError::SiteUnreachable {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

async fn read_body(url: &str, response: Response) -> Result<String> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let body = response.text().await.map_err(|e| unreachable(url, e))?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BotBlockError::RateLimited(RateLimit::from_response(
            &body,
            retry_after.as_deref(),
        )));
    }

    if !status.is_success() {
        return Err(BotBlockError::SiteUnreachable {
            url: url.to_string(),
            reason: format!("API responded with error code {status}"),
        });
    }

    if body.trim().is_empty() {
        debug!("Received empty response from {} (status {})", url, status);
        return Err(BotBlockError::MalformedResponse(format!(
            "empty body from {url}"
        )));
    }

    Ok(body)
}
