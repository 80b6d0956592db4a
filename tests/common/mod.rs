//! Shared fixtures for the integration tests

pub mod mocks;

use botblock::{BotBlockConfig, Site};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

pub const BOT_ID: u64 = 123_456_789_012_345_678;

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("botblock=debug"))
        .with_test_writer()
        .try_init();
}

#[allow(dead_code)]
pub fn config(interval_minutes: u64) -> BotBlockConfig {
    BotBlockConfig::builder()
        .add_token(Site::DiscordBotsGg, "gg-token")
        .expect("valid token")
        .add_token(Site::YablXyz, "yabl-token")
        .expect("valid token")
        .set_post_interval(interval_minutes)
        .expect("valid interval")
        .build()
        .expect("valid config")
}

#[allow(dead_code)]
pub fn bot_info_json() -> Value {
    json!({
        "id": BOT_ID.to_string(),
        "username": "Testbot",
        "discriminator": "0001",
        "owners": ["204232208049766400"],
        "server_count": 1337,
        "invite": "https://discord.com/oauth2/authorize?client_id=123456789012345678&scope=bot",
        "prefix": "!",
        "website": "https://testbot.example",
        "github": "https://github.com/example/testbot",
        "support": "https://discord.gg/example",
        "library": "serenity",
        "list_data": {
            "discord.bots.gg": [{"guildCount": 1337}, 200],
            "yabl.xyz": [null, 404]
        }
    })
}

#[allow(dead_code)]
pub fn list_json(host: &str, api_get: Option<&str>) -> Value {
    json!({
        "id": host,
        "added": 1_563_498_000,
        "name": "Discord Bots",
        "url": format!("https://{host}"),
        "icon": null,
        "language": "English",
        "display": 1,
        "defunct": 0,
        "discord_only": 1,
        "description": "A bot list",
        "api_docs": format!("https://{host}/docs"),
        "api_post": format!("https://{host}/api/v1/bots/:id/stats"),
        "api_field": "guildCount",
        "api_shard_id": "shardId",
        "api_shard_count": "shardCount",
        "api_shards": null,
        "api_get": api_get,
        "api_all": null,
        "view_bot": format!("https://{host}/bots/:id"),
        "bot_widget": null,
        "content": null,
        "owners": "someone",
        "discord": "https://discord.gg/example",
        "features": [
            {"name": "Has Ads", "id": "has_ads", "display": 3, "type": 1,
             "description": "Shows ads to users", "value": 1},
            {"name": "Markdown", "id": "markdown", "display": 0, "type": 0,
             "description": null, "value": 0}
        ]
    })
}
