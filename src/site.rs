use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{BotBlockError, Result};

/// Bot-listing directories known to the aggregator.
///
/// Every site is identified by the host the aggregator uses as its key, both in
/// token maps and in `lists`/`list_data` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Site {
    ArcaneCenterXyz,
    BladebotlistXyz,
    BlistXyz,
    BotlistSpace,
    BotsdatabaseCom,
    BotsDiscordlabsOrg,
    /// Shut down; kept so old configurations still resolve.
    BotsDistopXyz,
    BotsfordiscordCom,
    /// Shut down; kept so old configurations still resolve.
    BotsIdledevOrg,
    BotsOndiscordXyz,
    DblistaPl,
    DiscordappsDev,
    DiscordBoats,
    DiscordbotdirectoryNet,
    DiscordbotlistCom,
    DiscordbotsCo,
    DiscordBotsGg,
    DiscordextremelistXyz,
    DiscordlistologyCom,
    DisforgeCom,
    FateslistXyz,
    InfinitybotlistCom,
    ParadisebotsNet,
    SpaceBotListXyz,
    TopcordXyz,
    VoidbotsNet,
    WonderbotlistCom,
    YablXyz,
}

const GET: u8 = 0b01;
const POST: u8 = 0b10;

// host, supported methods, deprecated
const REGISTRY: &[(Site, &str, u8, bool)] = &[
    (Site::ArcaneCenterXyz, "arcane-center.xyz", POST, false),
    (Site::BladebotlistXyz, "bladebotlist.xyz", GET | POST, false),
    (Site::BlistXyz, "blist.xyz", GET | POST, false),
    (Site::BotlistSpace, "botlist.space", GET | POST, false),
    (Site::BotsdatabaseCom, "botsdatabase.com", GET | POST, false),
    (Site::BotsDiscordlabsOrg, "discordlabs.org", GET | POST, false),
    (Site::BotsDistopXyz, "bots.distop.xyz", 0, true),
    (Site::BotsfordiscordCom, "botsfordiscord.com", GET | POST, false),
    (Site::BotsIdledevOrg, "bots.idledev.org", 0, true),
    (Site::BotsOndiscordXyz, "bots.ondiscord.xyz", POST, false),
    (Site::DblistaPl, "dblista.pl", GET, false),
    (Site::DiscordappsDev, "discordapps.dev", GET | POST, false),
    (Site::DiscordBoats, "discord.boats", GET | POST, false),
    (Site::DiscordbotdirectoryNet, "discordbotdirectory.net", GET, false),
    (Site::DiscordbotlistCom, "discordbotlist.com", GET | POST, false),
    (Site::DiscordbotsCo, "discordbots.co", GET | POST, false),
    (Site::DiscordBotsGg, "discord.bots.gg", GET | POST, false),
    (Site::DiscordextremelistXyz, "discordextremelist.xyz", GET | POST, false),
    (Site::DiscordlistologyCom, "discordlistology.com", GET | POST, false),
    (Site::DisforgeCom, "disforge.com", POST, false),
    (Site::FateslistXyz, "fateslist.xyz", GET | POST, false),
    (Site::InfinitybotlistCom, "infinitybotlist.com", GET | POST, false),
    (Site::ParadisebotsNet, "paradisebots.net", GET | POST, false),
    (Site::SpaceBotListXyz, "space-bot-list.xyz", GET | POST, false),
    (Site::TopcordXyz, "topcord.xyz", GET | POST, false),
    (Site::VoidbotsNet, "voidbots.net", GET | POST, false),
    (Site::WonderbotlistCom, "wonderbotlist.com", GET | POST, false),
    (Site::YablXyz, "yabl.xyz", GET | POST, false),
];

const ALL: [Site; 28] = [
    Site::ArcaneCenterXyz,
    Site::BladebotlistXyz,
    Site::BlistXyz,
    Site::BotlistSpace,
    Site::BotsdatabaseCom,
    Site::BotsDiscordlabsOrg,
    Site::BotsDistopXyz,
    Site::BotsfordiscordCom,
    Site::BotsIdledevOrg,
    Site::BotsOndiscordXyz,
    Site::DblistaPl,
    Site::DiscordappsDev,
    Site::DiscordBoats,
    Site::DiscordbotdirectoryNet,
    Site::DiscordbotlistCom,
    Site::DiscordbotsCo,
    Site::DiscordBotsGg,
    Site::DiscordextremelistXyz,
    Site::DiscordlistologyCom,
    Site::DisforgeCom,
    Site::FateslistXyz,
    Site::InfinitybotlistCom,
    Site::ParadisebotsNet,
    Site::SpaceBotListXyz,
    Site::TopcordXyz,
    Site::VoidbotsNet,
    Site::WonderbotlistCom,
    Site::YablXyz,
];

impl Site {
    /// All known sites, in registry order.
    pub fn list() -> &'static [Site] {
        &ALL
    }

    /// Resolves a host such as `"discord.bots.gg"` to its site.
    pub fn resolve(identifier: &str) -> Result<Site> {
        let needle = identifier.trim();
        REGISTRY
            .iter()
            .find(|(_, host, _, _)| host.eq_ignore_ascii_case(needle))
            .map(|(site, _, _, _)| *site)
            .ok_or_else(|| BotBlockError::UnknownSite(identifier.to_string()))
    }

    fn entry(self) -> &'static (Site, &'static str, u8, bool) {
        // REGISTRY is laid out in declaration order
        &REGISTRY[self as usize]
    }

    pub fn host(self) -> &'static str {
        self.entry().1
    }

    pub fn supports_get(self) -> bool {
        self.entry().2 & GET != 0
    }

    pub fn supports_post(self) -> bool {
        self.entry().2 & POST != 0
    }

    /// Directory no longer operates; the aggregator ignores it.
    pub fn is_deprecated(self) -> bool {
        self.entry().3
    }

    pub(crate) fn require_get(self) -> Result<Site> {
        if self.supports_get() {
            Ok(self)
        } else {
            Err(BotBlockError::invalid(format!(
                "{} does not support GET requests!",
                self.host()
            )))
        }
    }

    pub(crate) fn require_post(self) -> Result<Site> {
        if self.supports_post() {
            Ok(self)
        } else {
            Err(BotBlockError::invalid(format!(
                "{} does not support POST requests!",
                self.host()
            )))
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.host())
    }
}

impl FromStr for Site {
    type Err = BotBlockError;

    fn from_str(s: &str) -> Result<Self> {
        Site::resolve(s)
    }
}

impl Serialize for Site {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.host())
    }
}

/// Anything a lookup can be targeted at: a [`Site`] or its host string.
pub trait IntoSite {
    fn into_site(self) -> Result<Site>;
}

impl IntoSite for Site {
    fn into_site(self) -> Result<Site> {
        Ok(self)
    }
}

impl IntoSite for &Site {
    fn into_site(self) -> Result<Site> {
        Ok(*self)
    }
}

impl IntoSite for &str {
    fn into_site(self) -> Result<Site> {
        Site::resolve(self)
    }
}

impl IntoSite for String {
    fn into_site(self) -> Result<Site> {
        Site::resolve(&self)
    }
}

impl IntoSite for &String {
    fn into_site(self) -> Result<Site> {
        Site::resolve(self)
    }
}
