//! Application configuration. Endpoints, credentials, paths.

use serde::Deserialize;

/// Mensa web service of the University of Bern.
pub const DEFAULT_WEB_SERVICE_URL: &str = "http://mensa.xonix.ch/v1";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding the menu cache (menus.db). Read from MENSA_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Base URL of the menu web service. Read from MENSA_WEB_SERVICE_URL.
    #[serde(default)]
    pub web_service_url: Option<String>,

    /// Timeout for every HTTP request in seconds. Read from MENSA_REQUEST_TIMEOUT_SECS.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Ratings backend
    // ─────────────────────────────────────────────────────────────────────────
    /// Ratings collection endpoint. Read from MENSA_RATINGS_URL.
    #[serde(default)]
    pub ratings_url: Option<String>,

    /// Read from MENSA_RATINGS_APP_ID.
    #[serde(default)]
    pub ratings_app_id: Option<String>,

    /// Read from MENSA_RATINGS_API_KEY.
    #[serde(default)]
    pub ratings_api_key: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("MENSA"));
        if let Ok(path) = std::env::var("MENSA_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    pub fn web_service_url_or_default(&self) -> String {
        self.web_service_url
            .clone()
            .unwrap_or_else(|| DEFAULT_WEB_SERVICE_URL.to_string())
    }

    /// Returns request timeout in seconds. Defaults to 15 if unset.
    pub fn request_timeout_secs_or_default(&self) -> u64 {
        self.request_timeout_secs.unwrap_or(15)
    }

    /// Returns true if the ratings backend is fully configured.
    pub fn is_ratings_configured(&self) -> bool {
        self.ratings_url.is_some() && self.ratings_app_id.is_some() && self.ratings_api_key.is_some()
    }
}
