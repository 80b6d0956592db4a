/// Constants used throughout the botblock client

// Aggregator endpoints
pub const BASE_URL: &str = "https://botblock.org/api/";
pub const ROUTE_COUNT: &str = "count";
pub const ROUTE_BOTS: &str = "bots";
pub const ROUTE_LISTS: &str = "lists";

// Posting cadence (minutes)
pub const DEFAULT_POST_INTERVAL: u64 = 30;
pub const MIN_POST_INTERVAL: u64 = 2;
pub const MAX_POST_INTERVAL: u64 = 7 * 24 * 60;

// The aggregator fans a POST out to every site sequentially
pub const POST_TIMEOUT_PER_SITE_SECS: u64 = 10;

// Used when a 429 carries neither a body hint nor a Retry-After header
pub const FALLBACK_RETRY_AFTER_SECS: u64 = 60;
// Longer hints are clamped to this
pub const MAX_RETRY_AFTER_SECS: u64 = 24 * 60 * 60;

// Config sources
pub const DEFAULT_CONFIG_PATH: &str = "botblock.toml";
pub const ENV_DEFAULT_TOKEN: &str = "BOTBLOCK_DEFAULT_TOKEN";
pub const ENV_POST_INTERVAL: &str = "BOTBLOCK_POST_INTERVAL";
pub const ENV_SITES: &str = "BOTBLOCK_SITES";
pub const ENV_TOKEN_PREFIX: &str = "BOTBLOCK_TOKEN_";

// User agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const USER_AGENT_NAME: &str = "botblock-rs";
