//! Coordinator discovery REST calls (apps and providers).
//!
//! Every failure degrades to an empty list; callers never see an error.

use serde::Deserialize;
use tracing::warn;

use playcast_core::protocol::types::DeviceClass;

/// Response wrapper used by every discovery endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(alias = "errorCode")]
    pub error_code: Option<i64>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// `data` when the error code is zero or absent.
    pub fn accept(self) -> Option<T> {
        match self.error_code {
            None | Some(0) => self.data,
            Some(code) => {
                warn!(code, error = self.error.as_deref().unwrap_or(""), "discovery call rejected");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub app_type: Option<String>,
    #[serde(rename = "posterURL", default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub device: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub id: String,
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub cpu_name: String,
    #[serde(default)]
    pub mem_size: f64,
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub mem_percent: f64,
}

#[derive(Debug, Deserialize)]
pub struct AppList {
    pub apps: Option<Vec<AppSummary>>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderList {
    pub providers: Option<Vec<ProviderSummary>>,
}

/// Decode a raw apps response body. Anything unusable is an empty list.
pub fn parse_apps(body: &str) -> Vec<AppSummary> {
    parse::<AppList>(body).and_then(|l| l.apps).unwrap_or_default()
}

/// Decode a raw providers response body. Anything unusable is an empty list.
pub fn parse_providers(body: &str) -> Vec<ProviderSummary> {
    parse::<ProviderList>(body).and_then(|l| l.providers).unwrap_or_default()
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Option<T> {
    match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(resp) => resp.accept(),
        Err(e) => {
            warn!(error = %e, "discovery response not decodable");
            None
        }
    }
}

#[derive(Clone)]
pub struct DiscoveryClient {
    http: reqwest::Client,
    base: String,
}

impl DiscoveryClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_apps(&self, device: DeviceClass) -> Vec<AppSummary> {
        let url = format!("{}/apps", self.base);
        let req = self.http.get(url).query(&[("device", device.as_str())]);
        match self.fetch(req).await {
            Some(body) => parse_apps(&body),
            None => Vec::new(),
        }
    }

    pub async fn list_providers(&self, owner_id: Option<&str>) -> Vec<ProviderSummary> {
        let url = format!("{}/providers", self.base);
        let mut req = self.http.get(url);
        if let Some(owner) = owner_id {
            req = req.query(&[("ownerID", owner)]);
        }
        match self.fetch(req).await {
            Some(body) => parse_providers(&body),
            None => Vec::new(),
        }
    }

    async fn fetch(&self, req: reqwest::RequestBuilder) -> Option<String> {
        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "discovery request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "discovery request rejected");
            return None;
        }
        match resp.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(error = %e, "discovery body unreadable");
                None
            }
        }
    }
}
