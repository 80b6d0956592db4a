use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BotBlockConfig;
use crate::constants::{POST_TIMEOUT_PER_SITE_SECS, ROUTE_COUNT, USER_AGENT_NAME, VERSION};
use crate::error::{BotBlockError, Result};
use crate::http::RequestHandler;
use crate::models::BotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardInfo {
    pub id: u32,
    pub count: u32,
}

/// Where the guild count comes from on each post: usually the bot runtime.
pub trait GuildCountSource: Send + Sync {
    fn bot_id(&self) -> BotId;

    fn guild_count(&self) -> u64;

    /// Shard this process represents, for bots running more than one shard.
    fn shard(&self) -> Option<ShardInfo> {
        None
    }
}

impl<T: GuildCountSource + ?Sized> GuildCountSource for Arc<T> {
    fn bot_id(&self) -> BotId {
        (**self).bot_id()
    }

    fn guild_count(&self) -> u64 {
        (**self).guild_count()
    }

    fn shard(&self) -> Option<ShardInfo> {
        (**self).shard()
    }
}

impl GuildCountSource for serenity::client::Context {
    fn bot_id(&self) -> BotId {
        self.cache.current_user().id.get().into()
    }

    fn guild_count(&self) -> u64 {
        self.cache.guild_count() as u64
    }

    fn shard(&self) -> Option<ShardInfo> {
        let count = self.cache.shard_count() as u32;
        (count > 1).then(|| ShardInfo {
            id: self.shard_id.0 as u32,
            count,
        })
    }
}

/// Guild count maintained by the caller, for bots that track guilds or shards
/// themselves. Share it behind an `Arc` and update it as guilds come and go.
#[derive(Debug)]
pub struct ManualGuildCount {
    bot_id: BotId,
    guild_count: AtomicU64,
    shard: Option<ShardInfo>,
}

impl ManualGuildCount {
    pub fn new(bot_id: impl Into<BotId>, guild_count: u64) -> Result<Self> {
        Ok(Self {
            bot_id: bot_id.into().validate()?,
            guild_count: AtomicU64::new(guild_count),
            shard: None,
        })
    }

    pub fn with_shard(mut self, id: u32, count: u32) -> Result<Self> {
        if count == 0 || id >= count {
            return Err(BotBlockError::invalid(format!(
                "Shard id {id} is out of range for {count} shards."
            )));
        }
        self.shard = Some(ShardInfo { id, count });
        Ok(self)
    }

    pub fn set_guild_count(&self, guild_count: u64) {
        self.guild_count.store(guild_count, Ordering::Relaxed);
    }
}

impl GuildCountSource for ManualGuildCount {
    fn bot_id(&self) -> BotId {
        self.bot_id.clone()
    }

    fn guild_count(&self) -> u64 {
        self.guild_count.load(Ordering::Relaxed)
    }

    fn shard(&self) -> Option<ShardInfo> {
        self.shard
    }
}

/// JSON body of `POST count`. Site tokens sit at the top level, keyed by host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuildCountPayload {
    pub bot_id: BotId,
    pub server_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<u32>,
    #[serde(flatten)]
    pub tokens: BTreeMap<String, String>,
}

impl GuildCountPayload {
    pub fn new(
        bot_id: impl Into<BotId>,
        server_count: u64,
        config: &BotBlockConfig,
    ) -> Result<Self> {
        Ok(Self {
            bot_id: bot_id.into().validate()?,
            server_count,
            shard_id: None,
            shard_count: None,
            tokens: config.resolved_tokens(),
        })
    }

    pub fn from_source<S: GuildCountSource + ?Sized>(
        source: &S,
        config: &BotBlockConfig,
    ) -> Result<Self> {
        let mut payload = Self::new(source.bot_id(), source.guild_count(), config)?;
        if let Some(shard) = source.shard() {
            payload.shard_id = Some(shard.id);
            payload.shard_count = Some(shard.count);
        }
        Ok(payload)
    }

    pub fn site_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Per-site outcome of a post, as reported by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostResponse {
    #[serde(default)]
    pub success: BTreeMap<String, Value>,
    #[serde(default)]
    pub failure: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteFailure {
    pub site: String,
    pub code: Option<i64>,
    pub message: Option<String>,
}

impl PostResponse {
    /// Failed sites; each failure is normally a `[code, message]` pair.
    pub fn failed_sites(&self) -> Vec<SiteFailure> {
        self.failure
            .iter()
            .map(|(site, detail)| {
                let pair = detail.as_array();
                SiteFailure {
                    site: site.clone(),
                    code: pair.and_then(|a| a.first()).and_then(Value::as_i64),
                    message: pair
                        .and_then(|a| a.get(1))
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                }
            })
            .collect()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failure.is_empty()
    }
}

/// Sends one guild-count payload. [`PostAction`] is the HTTP implementation;
/// the scheduler only depends on this trait.
#[async_trait]
pub trait GuildCountPoster: Send + Sync {
    async fn post(&self, payload: &GuildCountPayload) -> Result<PostResponse>;
}

/// Posts guild counts to the aggregator, which forwards them to each site.
#[derive(Debug, Clone)]
pub struct PostAction {
    handler: RequestHandler,
}

impl PostAction {
    pub fn new(bot_id: impl Into<BotId>) -> Self {
        Self::with_handler(RequestHandler::for_bot(bot_id))
    }

    pub fn with_handler(handler: RequestHandler) -> Self {
        Self { handler }
    }

    /// Uses the logged-in bot's name and id for the user agent.
    pub fn from_context(ctx: &serenity::client::Context) -> Self {
        let (name, id) = {
            let user = ctx.cache.current_user();
            (user.name.clone(), user.id.get())
        };
        Self::with_handler(RequestHandler::new(format!(
            "{name}/{USER_AGENT_NAME}-{VERSION} (serenity) DBots/{id}"
        )))
    }

    pub async fn post_guilds<S: GuildCountSource + ?Sized>(
        &self,
        source: &S,
        config: &BotBlockConfig,
    ) -> Result<PostResponse> {
        let payload = GuildCountPayload::from_source(source, config)?;
        self.post(&payload).await
    }

    pub async fn post_guild_count(
        &self,
        bot_id: impl Into<BotId>,
        guild_count: u64,
        config: &BotBlockConfig,
    ) -> Result<PostResponse> {
        let payload = GuildCountPayload::new(bot_id, guild_count, config)?;
        self.post(&payload).await
    }
}

#[async_trait]
impl GuildCountPoster for PostAction {
    async fn post(&self, payload: &GuildCountPayload) -> Result<PostResponse> {
        let sites = payload.site_count();
        if sites == 0 {
            return Err(BotBlockError::invalid(
                "Posting requires a token for at least one site.",
            ));
        }

        let url = self.handler.url(ROUTE_COUNT);
        let timeout = Duration::from_secs(sites as u64 * POST_TIMEOUT_PER_SITE_SECS);
        let response: PostResponse = self.handler.post_json(&url, payload, timeout).await?;

        debug!(
            "Posted {} guilds for bot {}: {} sites ok, {} failed",
            payload.server_count,
            payload.bot_id,
            response.success.len(),
            response.failure.len()
        );
        for failure in response.failed_sites() {
            warn!(
                "Site {} rejected the guild count: {} {}",
                failure.site,
                failure
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                failure.message.as_deref().unwrap_or("?")
            );
        }

        Ok(response)
    }
}
