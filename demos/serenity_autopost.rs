//! Serenity bot that keeps its guild count up to date on BotBlock.
//!
//! Needs `DISCORD_TOKEN` plus either a `botblock.toml` or `BOTBLOCK_*`
//! variables (see `BotBlockConfig::from_env`).

use std::sync::Arc;

use anyhow::Result;
use botblock::constants::DEFAULT_CONFIG_PATH;
use botblock::{AutoPoster, BotBlockConfig, LookupClient};
use serenity::{all::*, async_trait, model::gateway::Ready};
use tokio::sync::OnceCell;

struct Bot {
    config: Arc<BotBlockConfig>,
    poster: OnceCell<AutoPoster>,
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("Bot is ready as {}", ready.user.name);

        // ready fires again after a reconnect; only start posting once
        let poster = self
            .poster
            .get_or_init(|| async { AutoPoster::from_context(&ctx) })
            .await;
        if !poster.is_running() {
            poster.enable_auto_post(ctx.clone(), &self.config);
            tracing::info!(
                "Auto-posting guild count every {} minutes",
                self.config.post_interval_minutes()
            );
        }

        let lookup = LookupClient::new(false);
        match lookup.get_server_count(ready.user.id.get()).await {
            Ok(count) => tracing::info!("BotBlock currently reports {} guilds", count),
            Err(e) => tracing::warn!("Could not read current stats: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() {
        BotBlockConfig::load(DEFAULT_CONFIG_PATH)?
    } else {
        BotBlockConfig::from_env()?
    };
    tracing::info!("Loaded tokens for {} sites", config.resolved_tokens().len());

    let discord_token = std::env::var("DISCORD_TOKEN")?;
    let intents = GatewayIntents::GUILDS;

    let bot = Bot {
        config: Arc::new(config),
        poster: OnceCell::new(),
    };

    let mut client = Client::builder(&discord_token, intents)
        .event_handler(bot)
        .await?;

    tracing::info!("Starting bot...");
    client.start().await?;

    Ok(())
}
