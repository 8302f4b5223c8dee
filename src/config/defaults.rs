/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Config file
pub const DEFAULT_CONFIG_FILE: &str = "meeple.toml";
pub const CONFIG_FILE_ENV: &str = "MEEPLE_CONFIG";
pub const ENV_PREFIX: &str = "MEEPLE_";

// Remote catalog defaults
pub const DEFAULT_CATALOG_BASE_URL: &str = "https://boardgamegeek.com/xmlapi2";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "10s";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "5s";
pub const DEFAULT_MIN_REQUEST_INTERVAL: &str = "0s";

// Cache defaults
pub const DEFAULT_SEARCH_TTL: &str = "10m";
pub const DEFAULT_SEARCH_CAPACITY: usize = 256;
pub const DEFAULT_GAME_TTL: &str = "1h";
pub const DEFAULT_GAME_CAPACITY: usize = 500;
