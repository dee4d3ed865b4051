//! Download request builder
//!
//! Builds the three request shapes the backend understands as typed values.
//! A request is serialized to a URL exactly once, in [`DownloadRequest::to_url`];
//! every parameter value is percent-encoded there and nowhere else.
//!
//! Batch requests carry repeated keys (`file_urls[]`, `file_names[]`, ...).
//! The backend pairs them by position, so parameter order is significant.

use serde::Serialize;
use std::fmt;
use url::Url;

use super::selection::SelectionSet;
use super::types::{BrowserError, ItemKind, PublicKey};

const FILES_ARCHIVE_NAME: &str = "downloaded_files.zip";
const ITEMS_ARCHIVE_NAME: &str = "downloaded_items.zip";

/// Backend download endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadEndpoint {
    /// `download/?file_url&file_name`
    Single,
    /// `download_multiple/?public_key&file_urls[]&file_names[]`
    FilesBatch,
    /// `download_folders/?public_key&folder_paths[]&folder_names[]`
    FoldersBatch,
}

impl DownloadEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            DownloadEndpoint::Single => "download/",
            DownloadEndpoint::FilesBatch => "download_multiple/",
            DownloadEndpoint::FoldersBatch => "download_folders/",
        }
    }
}

impl fmt::Display for DownloadEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadEndpoint::Single => write!(f, "single file"),
            DownloadEndpoint::FilesBatch => write!(f, "file batch"),
            DownloadEndpoint::FoldersBatch => write!(f, "folder batch"),
        }
    }
}

/// An outbound download request, not yet serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub endpoint: DownloadEndpoint,
    /// Raw (unencoded) parameters in wire order
    pub params: Vec<(String, String)>,
    suggested_name: String,
}

impl DownloadRequest {
    fn new(endpoint: DownloadEndpoint, suggested_name: impl Into<String>) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
            suggested_name: suggested_name.into(),
        }
    }

    fn push(&mut self, key: &str, value: &str) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Values for a (possibly repeated) key, in order
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// File name the backend gives the transfer
    pub fn suggested_file_name(&self) -> &str {
        &self.suggested_name
    }

    /// Percent-encoded query string
    pub fn query_string(&self) -> String {
        let pairs: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        super::encode_query(&pairs)
    }

    /// Resolve against the backend base URL
    pub fn to_url(&self, base: &Url) -> Result<Url, BrowserError> {
        let mut url = endpoint_base(base).join(self.endpoint.path()).map_err(|e| {
            BrowserError::InvalidConfig(format!("Cannot build {} URL: {}", self.endpoint, e))
        })?;
        url.set_query(Some(&self.query_string()));
        Ok(url)
    }
}

/// Base URL with a trailing slash so relative endpoint paths append to it
pub(crate) fn endpoint_base(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

pub struct DownloadRequestBuilder;

impl DownloadRequestBuilder {
    /// Single-file download from a per-item action, independent of the selection
    pub fn single(download_ref: Option<&str>, display_name: &str) -> Result<DownloadRequest, BrowserError> {
        let download_ref = download_ref
            .filter(|r| !r.is_empty())
            .ok_or(BrowserError::Unavailable)?;

        let mut request = DownloadRequest::new(DownloadEndpoint::Single, display_name);
        request.push("file_url", download_ref);
        request.push("file_name", display_name);
        Ok(request)
    }

    /// Batch over the current selection.
    ///
    /// If any folder is selected the folder endpoint is used and selected
    /// files are left out of the request.
    pub fn batch(public_key: &PublicKey, selection: &SelectionSet) -> Result<DownloadRequest, BrowserError> {
        if selection.is_empty() {
            return Err(BrowserError::NothingSelected);
        }
        if public_key.is_empty() {
            return Err(BrowserError::MissingPublicKey);
        }

        let has_folders = selection.folders().next().is_some();
        let (endpoint, kind, ref_key, name_key, archive) = if has_folders {
            (
                DownloadEndpoint::FoldersBatch,
                ItemKind::Folder,
                "folder_paths[]",
                "folder_names[]",
                ITEMS_ARCHIVE_NAME,
            )
        } else {
            (
                DownloadEndpoint::FilesBatch,
                ItemKind::File,
                "file_urls[]",
                "file_names[]",
                FILES_ARCHIVE_NAME,
            )
        };

        let mut request = DownloadRequest::new(endpoint, archive);
        request.push("public_key", public_key.as_str());
        for item in selection.members().iter().filter(|i| i.kind == kind) {
            request.push(ref_key, &item.identifier);
            request.push(name_key, &item.display_name);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::types::SelectionItem;

    fn base() -> Url {
        Url::parse("http://localhost:8000/").unwrap()
    }

    #[test]
    fn test_single_requires_ref() {
        assert_eq!(
            DownloadRequestBuilder::single(None, "report.pdf"),
            Err(BrowserError::Unavailable)
        );
        assert_eq!(
            DownloadRequestBuilder::single(Some(""), "report.pdf"),
            Err(BrowserError::Unavailable)
        );
    }

    #[test]
    fn test_single_url_is_percent_encoded() {
        let request = DownloadRequestBuilder::single(
            Some("https://downloader.disk/d?hash=a&b=c"),
            "my report.pdf",
        )
        .unwrap();
        assert_eq!(request.suggested_file_name(), "my report.pdf");

        let url = request.to_url(&base()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/download/?file_url=https%3A%2F%2Fdownloader.disk%2Fd%3Fhash%3Da%26b%3Dc&file_name=my%20report.pdf"
        );
    }

    #[test]
    fn test_batch_empty_selection() {
        let selection = SelectionSet::new();
        assert_eq!(
            DownloadRequestBuilder::batch(&PublicKey::new("key"), &selection),
            Err(BrowserError::NothingSelected)
        );
    }

    #[test]
    fn test_batch_files_preserve_order() {
        let mut selection = SelectionSet::new();
        selection.toggle(SelectionItem::new(ItemKind::File, "ref-b", "b.txt"));
        selection.toggle(SelectionItem::new(ItemKind::File, "ref-a", "a.txt"));

        let request = DownloadRequestBuilder::batch(&PublicKey::new("key"), &selection).unwrap();
        assert_eq!(request.endpoint, DownloadEndpoint::FilesBatch);
        assert_eq!(request.values("public_key").collect::<Vec<_>>(), ["key"]);
        assert_eq!(request.values("file_urls[]").collect::<Vec<_>>(), ["ref-b", "ref-a"]);
        assert_eq!(request.values("file_names[]").collect::<Vec<_>>(), ["b.txt", "a.txt"]);
        assert_eq!(request.suggested_file_name(), FILES_ARCHIVE_NAME);
    }

    #[test]
    fn test_batch_folders_win_over_files() {
        let mut selection = SelectionSet::new();
        selection.toggle(SelectionItem::new(ItemKind::File, "ref-a", "a.txt"));
        selection.toggle(SelectionItem::new(ItemKind::Folder, "/Reports", "Reports"));

        let request = DownloadRequestBuilder::batch(&PublicKey::new("key"), &selection).unwrap();
        assert_eq!(request.endpoint, DownloadEndpoint::FoldersBatch);
        assert_eq!(request.values("folder_paths[]").collect::<Vec<_>>(), ["/Reports"]);
        assert_eq!(request.values("folder_names[]").collect::<Vec<_>>(), ["Reports"]);
        assert!(request.params.iter().all(|(_, v)| v != "ref-a" && v != "a.txt"));
        assert_eq!(request.suggested_file_name(), ITEMS_ARCHIVE_NAME);

        // building does not touch the selection
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_batch_url_encodes_keys_and_values() {
        let mut selection = SelectionSet::new();
        selection.toggle(SelectionItem::new(ItemKind::Folder, "/Отчёты/2023 Q1", "2023 Q1"));

        let request = DownloadRequestBuilder::batch(&PublicKey::new("abc+/="), &selection).unwrap();
        let url = request
            .to_url(&Url::parse("https://example.org/disk").unwrap())
            .unwrap();
        assert_eq!(url.path(), "/disk/download_folders/");
        let query = url.query().unwrap();
        assert!(query.starts_with("public_key=abc%2B%2F%3D&folder_paths%5B%5D=%2F%D0%9E"));
        assert!(query.ends_with("folder_names%5B%5D=2023%20Q1"));
    }

    #[test]
    fn test_batch_requires_public_key() {
        let mut selection = SelectionSet::new();
        selection.toggle(SelectionItem::new(ItemKind::File, "r", "n"));
        assert_eq!(
            DownloadRequestBuilder::batch(&PublicKey::new(""), &selection),
            Err(BrowserError::MissingPublicKey)
        );
    }
}
