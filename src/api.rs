use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::error::ConsoleError;

/// Backend capabilities reported by `func=basic`.
#[derive(Debug, Clone, Deserialize)]
pub struct Basic {
    pub clients: Vec<String>,
    pub sites: Vec<String>,
}

/// One file-level download job. Replaced wholesale on every poll.
#[derive(Debug, Clone, Deserialize)]
pub struct Download {
    pub id: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub download_id: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub save_path: String,
    #[serde(default)]
    pub resource_id: String,
    /// Open-ended status string; "" means queued.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub note: String,
}

/// Resource-level grouping of download jobs, joined to [`Download`]s
/// through `resource_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDownload {
    pub id: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub save_path: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One catalog entry from `func=searchr`. Not every backend sends `time`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteResource {
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub time: i64,
}

pub trait ApiClient: Send + Sync {
    fn fetch_basic(&self) -> Result<Basic, ConsoleError>;
    fn fetch_downloads(&self) -> Result<Vec<Download>, ConsoleError>;
    fn fetch_resource_downloads(&self) -> Result<Vec<ResourceDownload>, ConsoleError>;
    fn fetch_site_resources(&self, site: &str) -> Result<Vec<SiteResource>, ConsoleError>;
}

#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
    config: ApiConfig,
}

impl ApiHttpClient {
    pub fn new(config: ApiConfig) -> Result<Self, ConsoleError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("resource-console/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ConsoleError::Transport(err.to_string()))?,
        );
        // No request timeout and no retry; slow calls are the caller's problem.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None)
            .build()
            .map_err(|err| ConsoleError::Transport(err.to_string()))?;
        Ok(Self { client, config })
    }

    /// Sends one api call. Every function goes to the same endpoint; the
    /// backend dispatches on the `func` parameter. Errors pass through to the
    /// caller untouched: no retry, no backoff.
    pub fn call<T: DeserializeOwned>(
        &self,
        func: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ConsoleError> {
        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        form.push(("func", func));
        form.extend_from_slice(params);
        if let Some(token) = &self.config.token {
            form.push(("token", token.as_str()));
        }

        let request = if self.config.use_get {
            self.client.get(&self.config.api_url).query(&form)
        } else {
            self.client.post(&self.config.api_url).form(&form)
        };
        let response = request
            .send()
            .map_err(|err| ConsoleError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "api request failed".to_string());
            return Err(ConsoleError::Status { status, message });
        }
        response
            .json::<T>()
            .map_err(|err| ConsoleError::Decode(err.to_string()))
    }
}

impl ApiClient for ApiHttpClient {
    fn fetch_basic(&self) -> Result<Basic, ConsoleError> {
        self.call("basic", &[])
    }

    fn fetch_downloads(&self) -> Result<Vec<Download>, ConsoleError> {
        self.call("downloads", &[])
    }

    fn fetch_resource_downloads(&self) -> Result<Vec<ResourceDownload>, ConsoleError> {
        self.call("resource_downloads", &[])
    }

    fn fetch_site_resources(&self, site: &str) -> Result<Vec<SiteResource>, ConsoleError> {
        self.call("searchr", &[("qs", "none"), ("site", site)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_resource_defaults_missing_fields() {
        let parsed: SiteResource =
            serde_json::from_str(r#"{"id":"RJ01","title":"t","tags":["a","b"]}"#).unwrap();
        assert_eq!(parsed.id, "RJ01");
        assert_eq!(parsed.time, 0);
        assert_eq!(parsed.size, 0);
        assert_eq!(parsed.tags, vec!["a", "b"]);
    }

    #[test]
    fn download_status_defaults_to_queued() {
        let parsed: Download = serde_json::from_str(r#"{"id":3}"#).unwrap();
        assert_eq!(parsed.status, "");
    }
}
