use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants::{
    DEFAULT_POST_INTERVAL, ENV_DEFAULT_TOKEN, ENV_POST_INTERVAL, ENV_SITES,
    ENV_TOKEN_PREFIX, MAX_POST_INTERVAL, MIN_POST_INTERVAL,
};
use crate::error::{BotBlockError, Result};
use crate::site::Site;

/// Validated, immutable posting configuration.
///
/// Built through [`BotBlockConfigBuilder`], or loaded from a TOML file / the
/// environment, which go through the same builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotBlockConfig {
    tokens: BTreeMap<String, String>,
    default_token: Option<String>,
    default_sites: BTreeSet<Site>,
    post_interval: u64,
}

/// On-disk layout read by [`BotBlockConfig::load`].
#[derive(Debug, Deserialize)]
struct ConfigFile {
    post_interval: Option<u64>,
    default_token: Option<String>,
    #[serde(default)]
    sites: Vec<String>,
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

impl BotBlockConfig {
    pub fn builder() -> BotBlockConfigBuilder {
        BotBlockConfigBuilder::new()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| BotBlockError::Config(format!("{}: {}", path.display(), e)))?;
        let file: ConfigFile = toml::from_str(&contents)
            .map_err(|e| BotBlockError::Config(format!("{}: {}", path.display(), e)))?;

        let mut builder = BotBlockConfigBuilder::new();
        if !file.tokens.is_empty() {
            builder.set_tokens(file.tokens)?;
        }
        if let Some(token) = file.default_token {
            builder.default_token(token)?;
        }
        for site in &file.sites {
            builder.add_site(Site::resolve(site)?)?;
        }
        if let Some(minutes) = file.post_interval {
            builder.set_post_interval(minutes)?;
        }
        builder.build()
    }

    /// Reads `BOTBLOCK_*` variables, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let mut builder = BotBlockConfigBuilder::new();

        for (key, value) in vars {
            if key == ENV_DEFAULT_TOKEN {
                builder.default_token(value)?;
            } else if key == ENV_POST_INTERVAL {
                let minutes = value.trim().parse::<u64>().map_err(|_| {
                    BotBlockError::Config(format!("{ENV_POST_INTERVAL} is not a number: {value}"))
                })?;
                builder.set_post_interval(minutes)?;
            } else if key == ENV_SITES {
                // comma separated hosts posted to with the default token
                for site in value.split(',').filter(|s| !s.trim().is_empty()) {
                    builder.add_site(Site::resolve(site)?)?;
                }
            } else if let Some(suffix) = key.strip_prefix(ENV_TOKEN_PREFIX) {
                let site = Site::list()
                    .iter()
                    .find(|s| env_suffix(s.host()) == suffix)
                    .ok_or_else(|| BotBlockError::UnknownSite(suffix.to_string()))?;
                builder.add_token(*site, value)?;
            }
        }

        builder.build()
    }

    /// Tokens added explicitly, keyed by site host.
    pub fn tokens(&self) -> &BTreeMap<String, String> {
        &self.tokens
    }

    pub fn default_token(&self) -> Option<&str> {
        self.default_token.as_deref()
    }

    /// Token used for `site`: its own entry, else the default.
    pub fn token_for(&self, site: Site) -> Option<&str> {
        self.tokens
            .get(site.host())
            .map(String::as_str)
            .or(self.default_token.as_deref())
    }

    /// The site/token pairs sent to the aggregator with every post.
    pub fn resolved_tokens(&self) -> BTreeMap<String, String> {
        let mut resolved = self.tokens.clone();
        if let Some(default) = &self.default_token {
            for site in &self.default_sites {
                resolved
                    .entry(site.host().to_string())
                    .or_insert_with(|| default.clone());
            }
        }
        resolved
    }

    pub fn post_interval_minutes(&self) -> u64 {
        self.post_interval
    }

    pub fn post_interval(&self) -> Duration {
        let minutes = self.post_interval.min(MAX_POST_INTERVAL);
        Duration::from_secs(minutes.saturating_mul(60))
    }
}

/// Mutable builder for [`BotBlockConfig`]. Every setter validates its input
/// immediately; [`build`](Self::build) checks the cross-field invariants.
#[derive(Debug, Clone)]
pub struct BotBlockConfigBuilder {
    tokens: BTreeMap<String, String>,
    default_token: Option<String>,
    default_sites: BTreeSet<Site>,
    post_interval: u64,
}

impl Default for BotBlockConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BotBlockConfigBuilder {
    pub fn new() -> Self {
        Self {
            tokens: BTreeMap::new(),
            default_token: None,
            default_sites: BTreeSet::new(),
            post_interval: DEFAULT_POST_INTERVAL,
        }
    }

    pub fn add_token(&mut self, site: Site, token: impl Into<String>) -> Result<&mut Self> {
        let token = not_blank(token.into(), "Token")?;
        site.require_post()?;
        self.tokens.insert(site.host().to_string(), token);
        Ok(self)
    }

    /// Like [`add_token`](Self::add_token) but keyed by a raw identifier, so
    /// directories newer than [`Site`] can still be posted to.
    pub fn add_token_for(
        &mut self,
        identifier: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<&mut Self> {
        let identifier = not_blank(identifier.into(), "Site")?;
        let token = not_blank(token.into(), "Token")?;
        self.tokens.insert(identifier.trim().to_string(), token);
        Ok(self)
    }

    /// Replaces all explicit tokens.
    pub fn set_tokens<K, V>(&mut self, tokens: impl IntoIterator<Item = (K, V)>) -> Result<&mut Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut validated = BTreeMap::new();
        for (site, token) in tokens {
            let site = not_blank(site.into(), "Site")?;
            let token = not_blank(token.into(), "Token")?;
            validated.insert(site.trim().to_string(), token);
        }
        if validated.is_empty() {
            return Err(BotBlockError::invalid("Tokens may not be empty."));
        }
        self.tokens = validated;
        Ok(self)
    }

    pub fn default_token(&mut self, token: impl Into<String>) -> Result<&mut Self> {
        self.default_token = Some(not_blank(token.into(), "Default token")?);
        Ok(self)
    }

    /// Posts to `site` using the default token.
    pub fn add_site(&mut self, site: Site) -> Result<&mut Self> {
        site.require_post()?;
        self.default_sites.insert(site);
        Ok(self)
    }

    /// Minutes between posts, from [`MIN_POST_INTERVAL`] to [`MAX_POST_INTERVAL`].
    pub fn set_post_interval(&mut self, minutes: u64) -> Result<&mut Self> {
        if minutes < MIN_POST_INTERVAL {
            return Err(BotBlockError::invalid(format!(
                "Post interval may not be less than {MIN_POST_INTERVAL} minutes."
            )));
        }
        if minutes > MAX_POST_INTERVAL {
            return Err(BotBlockError::invalid(format!(
                "Post interval may not be more than {MAX_POST_INTERVAL} minutes."
            )));
        }
        self.post_interval = minutes;
        Ok(self)
    }

    pub fn build(&self) -> Result<BotBlockConfig> {
        if self.tokens.is_empty() && self.default_token.is_none() {
            return Err(BotBlockError::invalid("Tokens may not be empty."));
        }
        if self.default_token.is_none() {
            if let Some(site) = self
                .default_sites
                .iter()
                .find(|s| !self.tokens.contains_key(s.host()))
            {
                return Err(BotBlockError::invalid(format!(
                    "No token for {site} and no default token set."
                )));
            }
        }

        let config = BotBlockConfig {
            tokens: self.tokens.clone(),
            default_token: self.default_token.clone(),
            default_sites: self.default_sites.clone(),
            post_interval: self.post_interval,
        };
        // A default token alone names no site to post to
        if config.resolved_tokens().is_empty() {
            return Err(BotBlockError::invalid(
                "Default token set but no sites added to use it.",
            ));
        }
        Ok(config)
    }
}

fn not_blank(value: String, name: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(BotBlockError::invalid(format!("{name} may not be empty.")));
    }
    Ok(value)
}

fn env_suffix(host: &str) -> String {
    host.to_ascii_uppercase().replace(['.', '-'], "_")
}
