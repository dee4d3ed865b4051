//! Browsing Session
//!
//! A session owns everything one user works with: the public key, the
//! navigation controller and the selection. Front ends either call the
//! operations directly or translate their input into [`Action`]s and hand
//! them to [`BrowserSession::dispatch`]; nothing else mutates session state.

use serde::Serialize;
use tracing::info;
use url::Url;

use crate::browser::{
    BrowserError, DownloadRequest, DownloadRequestBuilder, FolderPath, ListingClient,
    NavigationController, NavigationOutcome, NavigationState, PublicKey, SelectionItem,
    SelectionSet,
};

/// A discrete user action
#[derive(Debug, Clone)]
pub enum Action {
    SetPublicKey(PublicKey),
    /// Breadcrumb or folder click
    Navigate(FolderPath),
    /// "Back": parent of the current path
    GoUp,
    /// "To root"
    GoRoot,
    ToggleSelection(SelectionItem),
    SelectAll(Vec<SelectionItem>),
    /// Select every selectable item of the displayed listing
    SelectAllVisible,
    ClearSelection,
    /// Per-file download button
    DownloadFile { download_ref: Option<String>, name: String },
    /// "Download selected"
    DownloadSelection,
}

/// Result of a successfully handled action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    PublicKeyChanged,
    /// `committed` is false when a newer navigation superseded this one
    Navigated { committed: bool },
    SelectionChanged { selected: usize },
    /// Send the user agent here to start the transfer
    Download { url: String, file_name: String },
}

pub struct BrowserSession<C> {
    public_key: PublicKey,
    backend_url: Url,
    navigation: NavigationController<C>,
    selection: SelectionSet,
}

impl<C: ListingClient> BrowserSession<C> {
    /// `backend_url` is where download requests are addressed
    pub fn new(client: C, backend_url: Url) -> Self {
        Self {
            public_key: PublicKey::default(),
            backend_url,
            navigation: NavigationController::new(client),
            selection: SelectionSet::new(),
        }
    }

    pub fn with_public_key(mut self, public_key: PublicKey) -> Self {
        self.public_key = public_key;
        self
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn set_public_key(&mut self, public_key: PublicKey) {
        self.public_key = public_key;
    }

    pub fn state(&self) -> &NavigationState {
        self.navigation.state()
    }

    pub fn navigation(&self) -> &NavigationController<C> {
        &self.navigation
    }

    /// For front ends that interleave fetches via `begin`/`fetch`/`complete`
    pub fn navigation_mut(&mut self) -> &mut NavigationController<C> {
        &mut self.navigation
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub async fn navigate(&mut self, path: FolderPath) -> Result<NavigationOutcome, BrowserError> {
        self.navigation.navigate(&self.public_key, path).await
    }

    pub async fn go_up(&mut self) -> Result<NavigationOutcome, BrowserError> {
        self.navigation.go_up(&self.public_key).await
    }

    pub async fn go_root(&mut self) -> Result<NavigationOutcome, BrowserError> {
        self.navigation.go_root(&self.public_key).await
    }

    pub fn toggle_selection(&mut self, item: SelectionItem) -> bool {
        self.selection.toggle(item)
    }

    pub fn select_all(&mut self, candidates: Vec<SelectionItem>) -> usize {
        self.selection.select_all(candidates)
    }

    pub fn select_all_visible(&mut self) -> usize {
        let candidates = self.navigation.state().current_listing.selection_candidates();
        self.selection.select_all(candidates)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_all();
    }

    pub fn build_single_download(&self, download_ref: Option<&str>, name: &str) -> Result<DownloadRequest, BrowserError> {
        DownloadRequestBuilder::single(download_ref, name)
    }

    pub fn build_batch_download(&self) -> Result<DownloadRequest, BrowserError> {
        DownloadRequestBuilder::batch(&self.public_key, &self.selection)
    }

    pub fn download_url(&self, request: &DownloadRequest) -> Result<Url, BrowserError> {
        request.to_url(&self.backend_url)
    }

    fn issue(&self, request: DownloadRequest) -> Result<ActionOutcome, BrowserError> {
        let url = self.download_url(&request)?;
        info!(
            "Issuing {} download '{}' ({} parameters)",
            request.endpoint,
            request.suggested_file_name(),
            request.params.len()
        );
        Ok(ActionOutcome::Download {
            url: url.to_string(),
            file_name: request.suggested_file_name().to_string(),
        })
    }

    fn selection_changed(&self) -> ActionOutcome {
        ActionOutcome::SelectionChanged { selected: self.selection.len() }
    }

    /// Handle one action. Errors end the action and leave state as it was.
    pub async fn dispatch(&mut self, action: Action) -> Result<ActionOutcome, BrowserError> {
        match action {
            Action::SetPublicKey(key) => {
                self.set_public_key(key);
                Ok(ActionOutcome::PublicKeyChanged)
            }
            Action::Navigate(path) => navigated(self.navigate(path).await?),
            Action::GoUp => navigated(self.go_up().await?),
            Action::GoRoot => navigated(self.go_root().await?),
            Action::ToggleSelection(item) => {
                self.toggle_selection(item);
                Ok(self.selection_changed())
            }
            Action::SelectAll(candidates) => {
                self.select_all(candidates);
                Ok(self.selection_changed())
            }
            Action::SelectAllVisible => {
                self.select_all_visible();
                Ok(self.selection_changed())
            }
            Action::ClearSelection => {
                self.clear_selection();
                Ok(self.selection_changed())
            }
            Action::DownloadFile { download_ref, name } => {
                let request = self.build_single_download(download_ref.as_deref(), &name)?;
                self.issue(request)
            }
            Action::DownloadSelection => {
                let request = self.build_batch_download()?;
                self.issue(request)
            }
        }
    }
}

fn navigated(outcome: NavigationOutcome) -> Result<ActionOutcome, BrowserError> {
    Ok(ActionOutcome::Navigated {
        committed: outcome == NavigationOutcome::Committed,
    })
}
