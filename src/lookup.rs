use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::constants::{ROUTE_BOTS, ROUTE_LISTS, USER_AGENT_NAME, VERSION};
use crate::error::{BotBlockError, Result};
use crate::http::RequestHandler;
use crate::models::{ApiField, BotId, BotInfo, ListData, ListFeature, ListInfo};
use crate::site::IntoSite;

/// Read-only lookups against the aggregator and, for raw bot pages, the
/// directories themselves.
///
/// Every call is its own round trip; nothing is cached. With `strict` off,
/// transport and decoding failures are logged and replaced by empty defaults.
/// Rate limits, unknown sites and invalid arguments are always returned.
#[derive(Debug, Clone)]
pub struct LookupClient {
    handler: RequestHandler,
    strict: bool,
}

impl LookupClient {
    pub fn new(strict: bool) -> Self {
        Self::with_handler(
            RequestHandler::new(format!("{USER_AGENT_NAME}/{VERSION}")),
            strict,
        )
    }

    pub fn with_handler(handler: RequestHandler, strict: bool) -> Self {
        Self { handler, strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn settle<T: Default>(&self, what: &str, result: Result<T>) -> Result<T> {
        match result {
            Err(e) if !self.strict && e.is_transient() => {
                warn!("Lookup of {} failed, using default: {}", what, e);
                Ok(T::default())
            }
            other => other,
        }
    }

    async fn fetch_bot(&self, id: &BotId) -> Result<BotInfo> {
        let url = self.handler.url(&format!("{ROUTE_BOTS}/{id}"));
        self.handler.get_json(&url).await
    }

    async fn fetch_lists(&self, filtered: bool) -> Result<BTreeMap<String, ListInfo>> {
        let mut url = self.handler.url(ROUTE_LISTS);
        if filtered {
            url.push_str("?filter=true");
        }
        self.handler.get_json(&url).await
    }

    async fn fetch_list(&self, host: &str) -> Result<ListInfo> {
        let url = self.handler.url(&format!("{ROUTE_LISTS}/{host}"));
        self.handler.get_json(&url).await
    }

    async fn fetch_directory_bot(&self, host: &str, id: &BotId) -> Result<Value> {
        let list = self.fetch_list(host).await?;
        let template = list
            .api_get
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                BotBlockError::MalformedResponse(format!("{host} publishes no GET endpoint"))
            })?;
        let url = template.replace(":id", id.as_str());
        self.handler.get_json(&url).await
    }

    pub async fn get_bot_info(&self, id: impl Into<BotId>) -> Result<BotInfo> {
        let id = id.into().validate()?;
        let result = self.fetch_bot(&id).await;
        self.settle("bot info", result)
    }

    pub async fn get_name(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.username)
    }

    pub async fn get_owners(&self, id: impl Into<BotId>) -> Result<Vec<String>> {
        Ok(self.get_bot_info(id).await?.owners)
    }

    pub async fn get_server_count(&self, id: impl Into<BotId>) -> Result<u64> {
        Ok(self.get_bot_info(id).await?.server_count)
    }

    pub async fn get_prefix(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.prefix)
    }

    pub async fn get_library(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.library)
    }

    /// OAuth invite URL.
    pub async fn get_invite(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.invite)
    }

    pub async fn get_website(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.website)
    }

    pub async fn get_support_link(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.support)
    }

    pub async fn get_github(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.github)
    }

    pub async fn get_discriminator(&self, id: impl Into<BotId>) -> Result<String> {
        Ok(self.get_bot_info(id).await?.discriminator)
    }

    /// What every directory reported about the bot, keyed by site host.
    pub async fn get_bot_list_info(
        &self,
        id: impl Into<BotId>,
    ) -> Result<BTreeMap<String, ListData>> {
        Ok(self.get_bot_info(id).await?.list_data)
    }

    /// What one directory reported about the bot. `None` when the aggregator
    /// has no entry for that site.
    pub async fn get_bot_list_info_for(
        &self,
        id: impl Into<BotId>,
        site: impl IntoSite,
    ) -> Result<Option<ListData>> {
        let site = site.into_site()?.require_get()?;
        let id = id.into().validate()?;

        let mut list_data = self.get_bot_list_info(id).await?;
        Ok(list_data.remove(site.host()))
    }

    /// Metadata of every directory the aggregator supports.
    pub async fn get_bot_lists(
        &self,
        id: impl Into<BotId>,
    ) -> Result<BTreeMap<String, ListInfo>> {
        let id = id.into().validate()?;
        debug!("Fetching all lists for bot {}", id);
        let result = self.fetch_lists(false).await;
        self.settle("lists", result)
    }

    /// Like [`get_bot_lists`](Self::get_bot_lists), without defunct or hidden
    /// directories.
    pub async fn get_filtered_bot_lists(
        &self,
        id: impl Into<BotId>,
    ) -> Result<BTreeMap<String, ListInfo>> {
        let id = id.into().validate()?;
        debug!("Fetching filtered lists for bot {}", id);
        let result = self.fetch_lists(true).await;
        self.settle("filtered lists", result)
    }

    pub async fn get_bot_list(&self, id: impl Into<BotId>, site: impl IntoSite) -> Result<ListInfo> {
        let site = site.into_site()?;
        let id = id.into().validate()?;
        debug!("Fetching list {} for bot {}", site, id);
        let result = self.fetch_list(site.host()).await;
        self.settle(site.host(), result)
    }

    pub async fn get_bot_list_features(
        &self,
        id: impl Into<BotId>,
        site: impl IntoSite,
    ) -> Result<Vec<ListFeature>> {
        Ok(self.get_bot_list(id, site).await?.features)
    }

    pub async fn get_api_field(
        &self,
        id: impl Into<BotId>,
        site: impl IntoSite,
        field: ApiField,
    ) -> Result<Option<String>> {
        let list = self.get_bot_list(id, site).await?;
        Ok(list.api_value(field).map(str::to_owned))
    }

    /// Reads the bot straight from a directory's own API, bypassing the
    /// aggregator. Shapes differ per directory, so the raw JSON is returned.
    pub async fn get_directory_bot(&self, id: impl Into<BotId>, site: impl IntoSite) -> Result<Value> {
        let site = site.into_site()?.require_get()?;
        let id = id.into().validate()?;

        let result = self.fetch_directory_bot(site.host(), &id).await;
        self.settle(site.host(), result)
    }
}
