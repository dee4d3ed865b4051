//! Public Folder Browser
//!
//! Navigation, selection and download-request building for folders shared by
//! public key. Listings come from a `ListingClient`; everything else is plain
//! owned state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            NavigationController              │
//! │   begin → fetch → complete (latest wins)     │
//! └──────────────────────────────────────────────┘
//!              │                      │
//!              ▼                      ▼
//!      ┌──────────────┐      ┌─────────────────┐
//!      │  FolderPath  │      │  ListingClient  │
//!      └──────────────┘      └─────────────────┘
//!                               │          │
//!                               ▼          ▼
//!                          ┌─────────┐ ┌────────┐
//!                          │ Backend │ │ Yandex │
//!                          └─────────┘ └────────┘
//!
//! ┌──────────────┐      ┌────────────────────────┐
//! │ SelectionSet │ ───▶ │ DownloadRequestBuilder │
//! └──────────────┘      └────────────────────────┘
//! ```

pub mod types;
pub mod path;
pub mod selection;
pub mod download;
pub mod navigation;
pub mod http_retry;
pub mod backend;
pub mod yandex;

pub use types::*;
pub use path::{Breadcrumb, FolderPath};
pub use selection::SelectionSet;
pub use download::{DownloadEndpoint, DownloadRequest, DownloadRequestBuilder};
pub use navigation::{NavigationController, NavigationOutcome, NavigationState, Phase, PendingNavigation};
pub use http_retry::HttpRetryConfig;
pub use backend::BackendListingClient;
pub use yandex::YandexPublicClient;

use async_trait::async_trait;

/// Source of folder listings
///
/// Implementations resolve one folder of a shared tree. They do not check the
/// public key; the navigation controller does that before calling `fetch`.
#[async_trait]
pub trait ListingClient: Send + Sync {
    /// Short name for logs
    fn display_name(&self) -> String;

    /// List `path` under the folder shared by `public_key`
    async fn fetch(&self, public_key: &PublicKey, path: &FolderPath) -> Result<Listing, BrowserError>;
}

#[async_trait]
impl<C: ListingClient + ?Sized> ListingClient for Box<C> {
    fn display_name(&self) -> String {
        (**self).display_name()
    }

    async fn fetch(&self, public_key: &PublicKey, path: &FolderPath) -> Result<Listing, BrowserError> {
        (**self).fetch(public_key, path).await
    }
}

/// Build an HTTP client with the given timeout
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Percent-encoded query string from raw pairs
pub(crate) fn encode_query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
