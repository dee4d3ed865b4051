//! Proxy backend listing client
//!
//! Lists folders through the backend's `get_files/` endpoint, the same
//! service that assembles batch downloads.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::download::endpoint_base;
use super::http_retry::{get_with_retry, HttpRetryConfig};
use super::{encode_query, http_client, BrowserError, FileEntry, FolderEntry, FolderPath, Listing, ListingClient, PublicKey};

const LISTING_ENDPOINT: &str = "get_files/";

#[derive(Debug, Deserialize)]
struct BackendFile {
    name: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    extension: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackendFolder {
    name: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct BackendListing {
    #[serde(default)]
    files: Vec<BackendFile>,
    #[serde(default)]
    folders: Vec<BackendFolder>,
    current_folder: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BackendResponse {
    Failure { error: String },
    Listing(BackendListing),
}

impl From<BackendListing> for Listing {
    fn from(raw: BackendListing) -> Self {
        Listing {
            files: raw
                .files
                .into_iter()
                .map(|f| {
                    let mut entry = FileEntry::new(f.name, f.file.filter(|r| !r.is_empty()));
                    if let Some(ext) = f.extension.filter(|e| !e.is_empty()) {
                        entry.extension = ext.to_lowercase();
                    }
                    entry
                })
                .collect(),
            folders: raw
                .folders
                .into_iter()
                .map(|f| FolderEntry::new(f.name, FolderPath::normalize(&f.path)))
                .collect(),
            current_folder_name: raw.current_folder,
        }
    }
}

/// Decode a `get_files/` body; `{"error": ...}` becomes `BrowserError::Remote` verbatim
fn parse_listing(body: &str) -> Result<Listing, BrowserError> {
    match serde_json::from_str::<BackendResponse>(body) {
        Ok(BackendResponse::Failure { error }) => Err(BrowserError::Remote(error)),
        Ok(BackendResponse::Listing(raw)) => Ok(raw.into()),
        Err(e) => Err(BrowserError::Remote(format!("Unexpected listing response: {}", e))),
    }
}

pub struct BackendListingClient {
    base_url: Url,
    client: reqwest::Client,
    retry: HttpRetryConfig,
}

impl BackendListingClient {
    pub fn new(base_url: Url, timeout_secs: u64, retry: HttpRetryConfig) -> Self {
        Self {
            base_url,
            client: http_client(timeout_secs),
            retry,
        }
    }

    fn listing_url(&self, public_key: &PublicKey, path: &FolderPath) -> Result<Url, BrowserError> {
        let mut url = endpoint_base(&self.base_url)
            .join(LISTING_ENDPOINT)
            .map_err(|e| BrowserError::InvalidConfig(format!("Invalid backend URL: {}", e)))?;
        let remote_path = path.remote_path();
        url.set_query(Some(&encode_query(&[
            ("public_key", public_key.as_str()),
            ("path", &remote_path),
        ])));
        Ok(url)
    }
}

#[async_trait]
impl ListingClient for BackendListingClient {
    fn display_name(&self) -> String {
        format!("backend ({})", self.base_url)
    }

    async fn fetch(&self, public_key: &PublicKey, path: &FolderPath) -> Result<Listing, BrowserError> {
        let url = self.listing_url(public_key, path)?;
        let response = get_with_retry(&self.client, url, &self.retry)
            .await
            .map_err(|e| BrowserError::Remote(format!("Network error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BrowserError::Remote(format!("Network error: {}", e)))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<BackendResponse>(&body) {
                Ok(BackendResponse::Failure { error }) => BrowserError::Remote(error),
                _ => BrowserError::Remote(format!("Backend returned HTTP {}", status.as_u16())),
            });
        }
        parse_listing(&body)
    }
}
