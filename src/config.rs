use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;

/// Endpoint the backend serves its api on when running next to the console.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:6968/api";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub use_get: Option<bool>,
}

/// Resolved backend connection settings. Constructed once and passed to the
/// api client explicitly; nothing reads globals after this point.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_url: String,
    pub token: Option<String>,
    /// When set, parameters travel in the query string instead of a POST body.
    pub use_get: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            use_get: false,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `resource-console.json` (or an explicit path) and fills in
    /// defaults. A missing default-location file is not an error; an explicit
    /// path must exist.
    pub fn resolve(path: Option<&str>) -> Result<ApiConfig, ConsoleError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("resource-console.json"),
        };

        let file = if !config_path.exists() && path.is_none() {
            ConfigFile::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| ConsoleError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| ConsoleError::ConfigParse(err.to_string()))?
        };

        let mut config = Self::resolve_config(file);
        if let Ok(token) = std::env::var("RESOURCE_CONSOLE_TOKEN") {
            if !token.trim().is_empty() {
                config.token = Some(token.trim().to_string());
            }
        }
        Ok(config)
    }

    pub fn resolve_config(file: ConfigFile) -> ApiConfig {
        ApiConfig {
            api_url: file
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: file.token,
            use_get: file.use_get.unwrap_or(false),
        }
    }
}
