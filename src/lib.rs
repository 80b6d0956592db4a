//! Client for the BotBlock aggregator, which republishes a Discord bot's guild
//! count to the bot-listing sites it supports.
//!
//! - [`BotBlockConfig`] holds the per-site tokens and the posting interval.
//! - [`AutoPoster`] posts the guild count on that interval in the background.
//! - [`LookupClient`] reads bot and site information back.

pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod lookup;
pub mod models;
pub mod post;
pub mod scheduler;
pub mod site;

pub use config::{BotBlockConfig, BotBlockConfigBuilder};
pub use error::{BotBlockError, RateLimit, Result};
pub use http::RequestHandler;
pub use lookup::LookupClient;
pub use models::{ApiField, BotId, BotInfo, ListData, ListFeature, ListInfo};
pub use post::{
    GuildCountPayload, GuildCountPoster, GuildCountSource, ManualGuildCount, PostAction,
    PostResponse, ShardInfo, SiteFailure,
};
pub use scheduler::AutoPoster;
pub use site::{IntoSite, Site};
