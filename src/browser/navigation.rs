//! Navigation controller
//!
//! Owns the navigation state and commits new listings with last-request-wins
//! semantics. A navigation runs in three steps:
//!
//! 1. `begin` checks the public key and issues a numbered request
//! 2. `fetch` asks the listing client (the only suspension point)
//! 3. `complete` commits the result if the request is still the latest
//!
//! `navigate` runs all three. An event loop that lets several fetches overlap
//! calls the steps itself; whichever order results arrive in, only the most
//! recently issued request can change the state.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::path::FolderPath;
use super::types::{BrowserError, Listing, PublicKey};
use super::ListingClient;

/// What is currently displayed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub current_path: FolderPath,
    pub current_listing: Listing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading { target: FolderPath },
}

/// Ticket for an issued navigation request
#[derive(Debug, Clone)]
pub struct PendingNavigation {
    request_id: u64,
    public_key: PublicKey,
    target: FolderPath,
}

impl PendingNavigation {
    pub fn target(&self) -> &FolderPath {
        &self.target
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The listing replaced the navigation state
    Committed,
    /// A newer request was issued; the result was dropped
    Superseded,
}

pub struct NavigationController<C> {
    client: C,
    state: NavigationState,
    phase: Phase,
    latest_request: u64,
}

impl<C: ListingClient> NavigationController<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: NavigationState::default(),
            phase: Phase::Idle,
            latest_request: 0,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// Issue a request for `path`. Fails without touching state when the key is missing.
    pub fn begin(&mut self, public_key: &PublicKey, path: FolderPath) -> Result<PendingNavigation, BrowserError> {
        if public_key.is_empty() {
            return Err(BrowserError::MissingPublicKey);
        }

        self.latest_request += 1;
        self.phase = Phase::Loading { target: path.clone() };
        debug!("Navigation #{} to '{}' issued", self.latest_request, path);

        Ok(PendingNavigation {
            request_id: self.latest_request,
            public_key: public_key.clone(),
            target: path,
        })
    }

    pub async fn fetch(&self, pending: &PendingNavigation) -> Result<Listing, BrowserError> {
        self.client.fetch(&pending.public_key, &pending.target).await
    }

    /// Apply the result of `pending`.
    ///
    /// Results of superseded requests are dropped, errors included. For the
    /// latest request a listing replaces the state wholesale and an error is
    /// returned with the state left as it was.
    pub fn complete(
        &mut self,
        pending: PendingNavigation,
        result: Result<Listing, BrowserError>,
    ) -> Result<NavigationOutcome, BrowserError> {
        if pending.request_id != self.latest_request {
            debug!(
                "Dropping result of navigation #{} to '{}' (latest is #{})",
                pending.request_id, pending.target, self.latest_request
            );
            return Ok(NavigationOutcome::Superseded);
        }

        self.phase = Phase::Idle;
        match result {
            Ok(listing) => {
                info!(
                    "Listed '{}' via {}: {} folders, {} files",
                    pending.target,
                    self.client.display_name(),
                    listing.folders.len(),
                    listing.files.len()
                );
                self.state = NavigationState {
                    current_path: pending.target,
                    current_listing: listing,
                };
                Ok(NavigationOutcome::Committed)
            }
            Err(e) => {
                warn!("Navigation to '{}' failed: {}", pending.target, e);
                Err(e)
            }
        }
    }

    pub async fn navigate(&mut self, public_key: &PublicKey, path: FolderPath) -> Result<NavigationOutcome, BrowserError> {
        let pending = self.begin(public_key, path)?;
        let result = self.fetch(&pending).await;
        self.complete(pending, result)
    }

    /// Navigate to the parent of the current path
    pub async fn go_up(&mut self, public_key: &PublicKey) -> Result<NavigationOutcome, BrowserError> {
        let parent = self.state.current_path.parent();
        self.navigate(public_key, parent).await
    }

    pub async fn go_root(&mut self, public_key: &PublicKey) -> Result<NavigationOutcome, BrowserError> {
        self.navigate(public_key, FolderPath::root()).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::browser::types::{FileEntry, FolderEntry};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory listing source keyed by remote path
    #[derive(Default)]
    pub(crate) struct FakeClient {
        pub listings: HashMap<String, Listing>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeClient {
        pub(crate) fn with(mut self, path: &str, listing: Listing) -> Self {
            self.listings.insert(FolderPath::normalize(path).remote_path(), listing);
            self
        }
    }

    #[async_trait]
    impl ListingClient for FakeClient {
        fn display_name(&self) -> String {
            "fake".to_string()
        }

        async fn fetch(&self, _public_key: &PublicKey, path: &FolderPath) -> Result<Listing, BrowserError> {
            let key = path.remote_path();
            self.calls.lock().unwrap().push(key.clone());
            self.listings
                .get(&key)
                .cloned()
                .ok_or_else(|| BrowserError::Remote(format!("Resource not found: {}", key)))
        }
    }

    pub(crate) fn listing(name: &str, folders: &[&str], files: &[&str]) -> Listing {
        Listing {
            files: files
                .iter()
                .map(|f| FileEntry::new(*f, Some(format!("https://dl/{}", f))))
                .collect(),
            folders: folders
                .iter()
                .map(|f| FolderEntry::new(*f, FolderPath::normalize(f)))
                .collect(),
            current_folder_name: name.to_string(),
        }
    }

    pub(crate) fn sample_client() -> FakeClient {
        FakeClient::default()
            .with("", listing("Shared", &["Reports", "Invoices"], &["readme.txt"]))
            .with("Reports", listing("Reports", &[], &["q1.pdf", "q2.pdf"]))
            .with("Invoices", listing("Invoices", &[], &["inv-001.pdf"]))
    }

    fn key() -> PublicKey {
        PublicKey::new("https://yadi.sk/d/abc")
    }

    #[tokio::test]
    async fn test_initial_state() {
        let ctrl = NavigationController::new(sample_client());
        assert!(ctrl.state().current_path.is_root());
        assert!(ctrl.state().current_listing.is_empty());
        assert_eq!(ctrl.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn test_navigate_commits() {
        let mut ctrl = NavigationController::new(sample_client());
        let outcome = ctrl.navigate(&key(), FolderPath::normalize("Reports")).await;
        assert_eq!(outcome, Ok(NavigationOutcome::Committed));
        assert_eq!(ctrl.state().current_path.to_string(), "Reports");
        assert_eq!(ctrl.state().current_listing.files.len(), 2);
        assert_eq!(ctrl.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn test_missing_public_key_leaves_state() {
        let mut ctrl = NavigationController::new(sample_client());
        let result = ctrl.navigate(&PublicKey::new(""), FolderPath::root()).await;
        assert_eq!(result, Err(BrowserError::MissingPublicKey));
        assert_eq!(ctrl.state(), &NavigationState::default());
        assert_eq!(ctrl.phase(), &Phase::Idle);
        assert!(ctrl.client().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_state() {
        let mut ctrl = NavigationController::new(sample_client());
        ctrl.navigate(&key(), FolderPath::normalize("Reports")).await.unwrap();
        let before = ctrl.state().clone();

        let result = ctrl.navigate(&key(), FolderPath::normalize("Missing")).await;
        assert!(matches!(result, Err(BrowserError::Remote(ref m)) if m.contains("/Missing")));
        assert_eq!(ctrl.state(), &before);
        assert_eq!(ctrl.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn test_later_request_wins_when_earlier_resolves_last() {
        let mut ctrl = NavigationController::new(sample_client());
        let reports = ctrl.begin(&key(), FolderPath::normalize("Reports")).unwrap();
        let invoices = ctrl.begin(&key(), FolderPath::normalize("Invoices")).unwrap();
        assert_eq!(
            ctrl.phase(),
            &Phase::Loading { target: FolderPath::normalize("Invoices") }
        );

        let (reports_result, invoices_result) =
            tokio::join!(ctrl.fetch(&reports), ctrl.fetch(&invoices));

        assert_eq!(ctrl.complete(invoices, invoices_result), Ok(NavigationOutcome::Committed));
        assert_eq!(ctrl.complete(reports, reports_result), Ok(NavigationOutcome::Superseded));

        assert_eq!(ctrl.state().current_path.to_string(), "Invoices");
        assert_eq!(ctrl.state().current_listing.current_folder_name, "Invoices");
        assert_eq!(ctrl.phase(), &Phase::Idle);
    }

    #[tokio::test]
    async fn test_earlier_request_resolving_first_is_dropped() {
        let mut ctrl = NavigationController::new(sample_client());
        let reports = ctrl.begin(&key(), FolderPath::normalize("Reports")).unwrap();
        let invoices = ctrl.begin(&key(), FolderPath::normalize("Invoices")).unwrap();

        let reports_result = ctrl.fetch(&reports).await;
        assert_eq!(ctrl.complete(reports, reports_result), Ok(NavigationOutcome::Superseded));
        // still waiting for the latest request
        assert!(ctrl.is_loading());
        assert!(ctrl.state().current_path.is_root());

        let invoices_result = ctrl.fetch(&invoices).await;
        ctrl.complete(invoices, invoices_result).unwrap();
        assert_eq!(ctrl.state().current_path.to_string(), "Invoices");
    }

    #[tokio::test]
    async fn test_superseded_failure_is_not_surfaced() {
        let mut ctrl = NavigationController::new(sample_client());
        let missing = ctrl.begin(&key(), FolderPath::normalize("Missing")).unwrap();
        let reports = ctrl.begin(&key(), FolderPath::normalize("Reports")).unwrap();

        let missing_result = ctrl.fetch(&missing).await;
        assert!(missing_result.is_err());
        assert_eq!(ctrl.complete(missing, missing_result), Ok(NavigationOutcome::Superseded));

        let reports_result = ctrl.fetch(&reports).await;
        assert_eq!(ctrl.complete(reports, reports_result), Ok(NavigationOutcome::Committed));
    }

    #[tokio::test]
    async fn test_go_up_and_root() {
        let client = sample_client().with("Reports/2023", listing("2023", &[], &[]));
        let mut ctrl = NavigationController::new(client);
        ctrl.navigate(&key(), FolderPath::normalize("Reports/2023")).await.unwrap();

        ctrl.go_up(&key()).await.unwrap();
        assert_eq!(ctrl.state().current_path.to_string(), "Reports");

        ctrl.go_root(&key()).await.unwrap();
        assert!(ctrl.state().current_path.is_root());
        assert_eq!(ctrl.state().current_listing.current_folder_name, "Shared");
    }
}
