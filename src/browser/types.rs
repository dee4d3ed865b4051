//! Shared types for the public-folder browser
//!
//! This module contains the entries, listings, selection items and the error
//! type used by every part of the browser: listing clients, the navigation
//! controller, the selection set and the download request builder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use super::path::FolderPath;

/// Label shown for the root folder before anything has been listed
pub const ROOT_LABEL: &str = "Home";

/// Shareable token identifying a remote root folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.trim()
    }

    /// A key made only of whitespace counts as missing
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl From<&str> for PublicKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for PublicKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Child folder of the listed path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub name: String,
    /// Absolute from the shared root
    pub path: FolderPath,
}

impl FolderEntry {
    pub fn new(name: impl Into<String>, path: FolderPath) -> Self {
        Self { name: name.into(), path }
    }
}

/// File in the listed folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Lowercase suffix including the dot, empty when the name has none
    pub extension: String,
    /// Opaque remote reference; `None` means the file cannot be downloaded directly
    pub download_ref: Option<String>,
}

impl FileEntry {
    /// Create a file entry, deriving the extension from the name
    pub fn new(name: impl Into<String>, download_ref: Option<String>) -> Self {
        let name = name.into();
        let extension = extension_of(&name);
        Self { name, extension, download_ref }
    }

    pub fn is_downloadable(&self) -> bool {
        self.download_ref.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Case-insensitive; the leading dot is optional and an empty filter matches everything
    pub fn matches_extension(&self, extension: &str) -> bool {
        let wanted = extension.trim().trim_start_matches('.');
        wanted.is_empty() || self.extension.trim_start_matches('.').eq_ignore_ascii_case(wanted)
    }
}

/// Lowercase extension with its leading dot.
///
/// A dot at the very start of the name does not start an extension, so
/// `.bashrc` has none while `archive.tar.gz` has `.gz`.
pub fn extension_of(name: &str) -> String {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].rfind('.') {
        Some(pos) => name[stem_start + pos..].to_lowercase(),
        None => String::new(),
    }
}

/// Contents of one folder path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub files: Vec<FileEntry>,
    pub folders: Vec<FolderEntry>,
    pub current_folder_name: String,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            folders: Vec::new(),
            current_folder_name: ROOT_LABEL.to_string(),
        }
    }
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Sorted, de-duplicated file extensions present in this listing
    pub fn available_extensions(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| !f.extension.is_empty())
            .map(|f| f.extension.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Files whose extension matches `extension` (case-insensitive).
    /// An empty filter keeps every file.
    pub fn files_with_extension<'a>(&'a self, extension: &'a str) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.files.iter().filter(move |f| f.matches_extension(extension))
    }

    /// Every selectable item shown for this listing, folders first.
    /// Files without a download reference have no identifier and are skipped.
    pub fn selection_candidates(&self) -> Vec<SelectionItem> {
        self.folders
            .iter()
            .map(SelectionItem::folder)
            .chain(self.files.iter().filter_map(SelectionItem::file))
            .collect()
    }

    pub fn find_file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn find_folder(&self, name: &str) -> Option<&FolderEntry> {
        self.folders.iter().find(|f| f.name == name)
    }
}

/// Kind of a selected item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::File => write!(f, "file"),
            ItemKind::Folder => write!(f, "folder"),
        }
    }
}

/// An item the user has marked for download.
///
/// Identity is `(kind, identifier)`: the download reference for files and the
/// remote path for folders. The display name is carried along for the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionItem {
    pub kind: ItemKind,
    pub identifier: String,
    pub display_name: String,
}

impl SelectionItem {
    pub fn new(kind: ItemKind, identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            display_name: display_name.into(),
        }
    }

    pub fn folder(entry: &FolderEntry) -> Self {
        Self::new(ItemKind::Folder, entry.path.remote_path(), entry.name.clone())
    }

    /// `None` when the file has no download reference
    pub fn file(entry: &FileEntry) -> Option<Self> {
        entry
            .download_ref
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| Self::new(ItemKind::File, r, entry.name.clone()))
    }

    pub fn key(&self) -> (ItemKind, &str) {
        (self.kind, self.identifier.as_str())
    }
}

impl PartialEq for SelectionItem {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SelectionItem {}

impl std::hash::Hash for SelectionItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Browser error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("No public key provided")]
    MissingPublicKey,

    /// Listing fetch failed; the message is shown as-is
    #[error("{0}")]
    Remote(String),

    #[error("File is not available for download")]
    Unavailable,

    #[error("Select files or folders to download")]
    NothingSelected,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BrowserError {
    /// Whether this error came from the remote side rather than a local precondition
    pub fn is_remote(&self) -> bool {
        matches!(self, BrowserError::Remote(_))
    }
}
