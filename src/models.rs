use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{BotBlockError, Result as BotBlockResult};

/// A bot's Discord user id, accepted as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotId(String);

impl BotId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects blank ids before any request is built.
    pub fn validate(self) -> BotBlockResult<Self> {
        if self.0.trim().is_empty() {
            return Err(BotBlockError::InvalidArgument(
                "Bot id may not be empty.".to_string(),
            ));
        }
        Ok(Self(self.0.trim().to_string()))
    }
}

impl From<u64> for BotId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for BotId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BotId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&BotId> for BotId {
    fn from(id: &BotId) -> Self {
        id.clone()
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregated bot information from `GET bots/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub username: String,
    #[serde(default, deserialize_with = "nullable")]
    pub discriminator: String,
    #[serde(default, deserialize_with = "nullable")]
    pub owners: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub server_count: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub invite: String,
    #[serde(default, deserialize_with = "nullable")]
    pub prefix: String,
    #[serde(default, deserialize_with = "nullable")]
    pub website: String,
    #[serde(default, deserialize_with = "nullable")]
    pub github: String,
    #[serde(default, deserialize_with = "nullable")]
    pub support: String,
    #[serde(default, deserialize_with = "nullable")]
    pub library: String,
    /// Per-directory results keyed by site host.
    #[serde(default, deserialize_with = "nullable")]
    pub list_data: BTreeMap<String, ListData>,
}

/// One `list_data` entry: the directory's own payload and the HTTP status the
/// aggregator got when fetching it. Sent as a two-element array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListData(pub Value, pub u16);

impl ListData {
    pub fn data(&self) -> &Value {
        &self.0
    }

    pub fn status(&self) -> u16 {
        self.1
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.1)
    }
}

/// Directory metadata from `GET lists` / `GET lists/{site}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub added: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    pub icon: Option<String>,
    pub language: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub display: bool,
    #[serde(default, deserialize_with = "flag")]
    pub defunct: bool,
    #[serde(default, deserialize_with = "flag")]
    pub discord_only: bool,
    pub description: Option<String>,
    pub api_docs: Option<String>,
    pub api_post: Option<String>,
    pub api_field: Option<String>,
    pub api_shard_id: Option<String>,
    pub api_shard_count: Option<String>,
    pub api_shards: Option<String>,
    pub api_get: Option<String>,
    pub api_all: Option<String>,
    pub view_bot: Option<String>,
    pub bot_widget: Option<String>,
    pub content: Option<String>,
    pub owners: Option<String>,
    pub discord: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub features: Vec<ListFeature>,
}

impl ListInfo {
    pub fn api_value(&self, field: ApiField) -> Option<&str> {
        let value = match field {
            ApiField::ServerCount => &self.api_field,
            ApiField::ShardId => &self.api_shard_id,
            ApiField::ShardCount => &self.api_shard_count,
            ApiField::Shards => &self.api_shards,
            ApiField::UrlAll => &self.api_all,
            ApiField::UrlDocs => &self.api_docs,
            ApiField::UrlGet => &self.api_get,
            ApiField::UrlPost => &self.api_post,
        };
        value.as_deref()
    }
}

/// A directory feature flag, e.g. "Has Ads".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFeature {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub display: i64,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: i64,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub value: bool,
}

/// API description fields a directory publishes through the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiField {
    /// Name of the guild-count field in the directory's POST body.
    ServerCount,
    ShardId,
    ShardCount,
    Shards,
    UrlAll,
    UrlDocs,
    UrlGet,
    UrlPost,
}

impl ApiField {
    pub fn key(self) -> &'static str {
        match self {
            ApiField::ServerCount => "api_field",
            ApiField::ShardId => "api_shard_id",
            ApiField::ShardCount => "api_shard_count",
            ApiField::Shards => "api_shards",
            ApiField::UrlAll => "api_all",
            ApiField::UrlDocs => "api_docs",
            ApiField::UrlGet => "api_get",
            ApiField::UrlPost => "api_post",
        }
    }
}

impl fmt::Display for ApiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// Directories send null for absent values
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Flags arrive as 0/1, booleans or null depending on the endpoint
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}
