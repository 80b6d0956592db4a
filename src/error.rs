use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::constants::{FALLBACK_RETRY_AFTER_SECS, MAX_RETRY_AFTER_SECS};

pub type Result<T> = std::result::Result<T, BotBlockError>;

/// Errors returned by the configuration, lookup and posting APIs.
#[derive(Debug, thiserror::Error)]
pub enum BotBlockError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("{0}")]
    RateLimited(RateLimit),

    #[error("Could not reach {url}: {reason}")]
    SiteUnreachable { url: String, reason: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BotBlockError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether a best-effort lookup may replace this error with a default value.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SiteUnreachable { .. } | Self::MalformedResponse(_)
        )
    }
}

impl From<serde_json::Error> for BotBlockError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Details of a rate-limited request.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimit {
    pub retry_after: Duration,
    pub route: Option<String>,
    pub bot_id: Option<String>,
    pub ip: Option<String>,
    pub limited_at: DateTime<Utc>,
}

impl RateLimit {
    /// Parses a 429 body, falling back to the `Retry-After` header value when
    /// the body has no usable hint.
    pub fn from_response(body: &str, retry_after_header: Option<&str>) -> Self {
        let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);

        let usable = |s: &f64| s.is_finite() && *s >= 0.0;
        let header_secs = retry_after_header
            .and_then(|h| h.trim().parse::<f64>().ok())
            .filter(usable);
        let secs = json
            .get("retry_after")
            .and_then(Value::as_f64)
            .filter(usable)
            .or(header_secs)
            .unwrap_or(FALLBACK_RETRY_AFTER_SECS as f64);

        let ceiling = Duration::from_secs(MAX_RETRY_AFTER_SECS);
        let retry_after = Duration::try_from_secs_f64(secs)
            .map_or(ceiling, |wait| wait.min(ceiling));

        Self {
            retry_after,
            route: text_field(&json, "ratelimit_route"),
            bot_id: text_field(&json, "ratelimit_bot_id"),
            ip: text_field(&json, "ratelimit_ip"),
            limited_at: Utc::now(),
        }
    }

    /// Wall-clock time after which the route may be used again.
    pub fn retry_at(&self) -> DateTime<Utc> {
        let wait = chrono::Duration::from_std(self.retry_after)
            .unwrap_or_else(|_| chrono::Duration::seconds(FALLBACK_RETRY_AFTER_SECS as i64));
        self.limited_at + wait
    }
}

// Ids are sometimes sent as numbers
fn text_field(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Got rate limited on route {} with bot id {} (ip: {}). Retry after: {}s",
            self.route.as_deref().unwrap_or("?"),
            self.bot_id.as_deref().unwrap_or("?"),
            self.ip.as_deref().unwrap_or("?"),
            self.retry_after.as_secs()
        )
    }
}
