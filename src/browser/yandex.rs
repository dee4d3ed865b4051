//! Yandex Disk public resources client
//!
//! Lists a shared folder straight from the public-resources API, without the
//! proxy backend. Items of type `dir` become folders; everything else is a
//! file whose `file` field is its direct download reference.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::http_retry::{get_with_retry, HttpRetryConfig};
use super::{encode_query, http_client, BrowserError, FileEntry, FolderEntry, FolderPath, Listing, ListingClient, PublicKey};

pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net/v1/disk/public/resources";

#[derive(Debug, Deserialize)]
struct YandexItem {
    #[serde(default = "unknown_name")]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    file: Option<String>,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Default, Deserialize)]
struct YandexEmbedded {
    #[serde(default)]
    items: Vec<YandexItem>,
}

#[derive(Debug, Deserialize)]
struct YandexResource {
    #[serde(default)]
    name: String,
    #[serde(rename = "_embedded", default)]
    embedded: Option<YandexEmbedded>,
}

#[derive(Debug, Deserialize)]
struct YandexApiError {
    #[serde(default)]
    message: Option<String>,
}

impl From<YandexResource> for Listing {
    fn from(resource: YandexResource) -> Self {
        let mut listing = Listing {
            files: Vec::new(),
            folders: Vec::new(),
            current_folder_name: resource.name,
        };
        for item in resource.embedded.unwrap_or_default().items {
            if item.kind == "dir" {
                listing
                    .folders
                    .push(FolderEntry::new(item.name, FolderPath::normalize(&item.path)));
            } else {
                listing
                    .files
                    .push(FileEntry::new(item.name, item.file.filter(|f| !f.is_empty())));
            }
        }
        listing
    }
}

fn api_error(status: u16, body: &str) -> BrowserError {
    let message = serde_json::from_str::<YandexApiError>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| "Unknown error".to_string());
    BrowserError::Remote(format!("Yandex Disk API error: {} - {}", status, message))
}

pub struct YandexPublicClient {
    api_url: Url,
    client: reqwest::Client,
    retry: HttpRetryConfig,
}

impl YandexPublicClient {
    pub fn new(api_url: Url, timeout_secs: u64, retry: HttpRetryConfig) -> Self {
        Self {
            api_url,
            client: http_client(timeout_secs),
            retry,
        }
    }

    /// The root is listed by omitting `path`
    fn resource_url(&self, public_key: &PublicKey, path: &FolderPath) -> Url {
        let mut url = self.api_url.clone();
        let remote_path = path.remote_path();
        let mut pairs = vec![("public_key", public_key.as_str())];
        if !path.is_root() {
            pairs.push(("path", remote_path.as_str()));
        }
        url.set_query(Some(&encode_query(&pairs)));
        url
    }
}

#[async_trait]
impl ListingClient for YandexPublicClient {
    fn display_name(&self) -> String {
        "Yandex Disk".to_string()
    }

    async fn fetch(&self, public_key: &PublicKey, path: &FolderPath) -> Result<Listing, BrowserError> {
        let url = self.resource_url(public_key, path);
        let response = get_with_retry(&self.client, url, &self.retry)
            .await
            .map_err(|e| BrowserError::Remote(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BrowserError::Remote(format!("Network error: {}", e)))?;

        if status.as_u16() != 200 {
            return Err(api_error(status.as_u16(), &body));
        }

        serde_json::from_str::<YandexResource>(&body)
            .map(Listing::from)
            .map_err(|e| BrowserError::Remote(format!("Unexpected Yandex Disk response: {}", e)))
    }
}
