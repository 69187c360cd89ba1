use serde::Deserialize;

fn default_forecast_url() -> String { "https://api.open-meteo.com/v1/forecast".to_string() }
fn default_archive_url() -> String { "https://archive-api.open-meteo.com/v1/archive".to_string() }
fn default_archive_lag_days() -> i64 { 5 }
fn default_timeout_s() -> u64 { 10 }
fn default_max_retries() -> u32 { 2 }
fn default_max_concurrent_fetches() -> usize { 4 }
fn default_geocoder_url() -> String { "https://nominatim.openstreetmap.org/search".to_string() }
fn default_user_agent() -> String { "solar_estimator".to_string() }
fn default_cache_enabled() -> bool { true }
fn default_cache_max_entries() -> usize { 4096 }

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    /// Days older than this (relative to today) are served from the archive endpoint
    #[serde(default = "default_archive_lag_days")]
    pub archive_lag_days: i64,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Upper bound on in-flight day fetches within one run
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            archive_url: default_archive_url(),
            archive_lag_days: default_archive_lag_days(),
            timeout_s: default_timeout_s(),
            max_retries: default_max_retries(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_url")]
    pub url: String,
    /// Nominatim rejects requests without an identifying agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
            user_agent: default_user_agent(),
            timeout_s: default_timeout_s(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
