//! Session state machine and catalog loading coordination.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::signal::{is_trusted_origin, AuthCompletion, AuthMessage, CompletionStore};
use collector_client::{AuthEvent, CollectorClient, CollectorClientError, ExportDownload};
use collector_core::selection::{SelectionEntry, SelectionState};
use collector_core::types::{CollectionId, CollectionKind, ExportFormat, TrackId, UserQuota};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Delays between passive status-check attempts right after a login.
const STATUS_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(3),
];

/// Deadline after which a login attempt counts as stalled. The attempt is
/// never cancelled; this only drives the stalled indicator.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Client-side belief about the session, reconciled with server truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing established yet
    Unknown,
    /// A status check is in progress
    Checking,
    /// The backend confirmed the session
    Authenticated,
    /// No valid session; recoverable by re-login
    Unauthenticated,
}

/// How this process entered the session, in priority order.
#[derive(Debug, Clone)]
pub enum LoginEntry {
    /// The process was handed an OAuth callback capture.
    RedirectCallback {
        /// Authorization code, if the provider granted one
        code: Option<String>,
        /// Provider error, if it refused
        error: Option<String>,
    },
    /// A login completion payload was delivered directly.
    Completion(AuthCompletion),
    /// No explicit entry; consult the completion store, then ask the backend.
    None,
}

/// Session behavior knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Which catalog family to browse
    pub kind: CollectionKind,
    /// Eagerly fetch every collection's tracks once the list is loaded.
    /// Trades request volume for instant expansion.
    pub prefetch_tracks: bool,
    /// Where login completion records are exchanged, if anywhere
    pub completion_store: Option<CompletionStore>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kind: CollectionKind::Playlists,
            prefetch_tracks: true,
            completion_store: None,
        }
    }
}

/// Owns the authenticated session: auth state, catalog, selection, and the
/// error banner. Single-threaded and event-driven; all coordination happens
/// through `&mut self` methods.
pub struct SessionManager {
    client: Arc<CollectorClient>,
    config: SessionConfig,
    auth_events: broadcast::Receiver<AuthEvent>,
    state: AuthState,
    catalog: Catalog,
    selection: SelectionState,
    // One-shot guard for the entry protocol: armed at creation, disarmed
    // permanently after first use.
    entry_handled: bool,
    last_error: Option<String>,
    login_deadline: Option<Instant>,
}

impl SessionManager {
    /// Create a manager over the given client.
    pub fn new(client: Arc<CollectorClient>, config: SessionConfig) -> Self {
        let auth_events = client.subscribe_auth_events();
        Self {
            client,
            config,
            auth_events,
            state: AuthState::Unknown,
            catalog: Catalog::default(),
            selection: SelectionState::default(),
            entry_handled: false,
            last_error: None,
            login_deadline: None,
        }
    }

    /// Current auth state.
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Whether the session is currently authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Catalog state (collections, tracks, loading flags, quota).
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Selection state.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// The current user-visible error banner, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Run the session entry protocol. Executes at most once per process;
    /// later calls are no-ops even if the first outcome was a failure.
    pub async fn synchronize(&mut self, entry: LoginEntry) {
        if self.entry_handled {
            debug!("Session entry already handled, skipping");
            return;
        }
        self.entry_handled = true;

        match entry {
            LoginEntry::RedirectCallback { code, error } => {
                if let Some(error) = error {
                    warn!(error = %error, "OAuth callback carried an error");
                    self.force_unauthenticated(Some(format!("Authentication failed: {error}")));
                } else if let Some(code) = code {
                    match self.client.exchange_code(&code).await {
                        Ok(_) => self.enter_authenticated(None).await,
                        Err(e) => {
                            warn!(error = %e, "OAuth code exchange failed");
                            self.force_unauthenticated(Some(
                                "Authentication failed. Please try again.".to_string(),
                            ));
                        }
                    }
                } else {
                    self.check_status().await;
                }
            }
            LoginEntry::Completion(completion) => self.apply_completion(completion).await,
            LoginEntry::None => {
                let pending = self
                    .config
                    .completion_store
                    .as_ref()
                    .and_then(CompletionStore::take_fresh);
                match pending {
                    Some(completion) => self.apply_completion(completion).await,
                    None => self.check_status().await,
                }
            }
        }
    }

    /// Handle an inbound completion message. The payload is only trusted if
    /// its origin matches the backend origin; anything else is ignored.
    ///
    /// Unlike [`Self::synchronize`], this may arrive at any point in the
    /// session, since the login flow completes outside this process.
    pub async fn handle_message(&mut self, message: AuthMessage) {
        if !is_trusted_origin(&message.origin, self.client.base_url()) {
            warn!(origin = %message.origin, "Ignoring completion message from untrusted origin");
            return;
        }
        self.apply_completion(message.completion).await;
    }

    /// Start a login attempt: returns the browser-facing auth URL and arms
    /// the stalled-login deadline.
    pub fn begin_login(&mut self) -> String {
        self.last_error = None;
        self.login_deadline = Some(Instant::now() + LOGIN_TIMEOUT);
        self.client.auth_url()
    }

    /// Whether an armed login attempt has passed its deadline without
    /// completing.
    pub fn login_stalled(&self) -> bool {
        match self.login_deadline {
            Some(deadline) => !self.is_authenticated() && Instant::now() >= deadline,
            None => false,
        }
    }

    /// Load the collection list and quota snapshot, then prefetch tracks if
    /// configured. Called once per transition into Authenticated; never
    /// retried automatically.
    pub async fn load_collections(&mut self) {
        match self.client.catalog().list_collections(self.config.kind).await {
            Ok(listing) => {
                info!(collections = listing.collections.len(), "Loaded collection list");
                self.catalog.set_collections(listing.collections);
                self.catalog.set_quota(listing.quota);
                self.last_error = None;

                if self.config.prefetch_tracks {
                    let ids: Vec<CollectionId> = self
                        .catalog
                        .collections()
                        .iter()
                        .map(|c| c.id.clone())
                        .collect();
                    self.load_tracks_batch(ids).await;
                }
            }
            Err(e) => self.note_failure("Failed to fetch playlists", &e),
        }
    }

    /// Fetch one collection's tracks. A no-op if they are already present
    /// or already in flight.
    pub async fn load_tracks(&mut self, id: &CollectionId) {
        self.load_tracks_batch(vec![id.clone()]).await;
    }

    /// Fetch several collections' tracks concurrently, applying results in
    /// arrival order. Ids already loaded or loading are skipped; every
    /// issued fetch clears its loading flag regardless of outcome.
    pub async fn load_tracks_batch(&mut self, ids: Vec<CollectionId>) {
        let mut pending = FuturesUnordered::new();
        for id in ids {
            if !self.catalog.begin_loading(&id) {
                continue;
            }
            let client = Arc::clone(&self.client);
            let kind = self.config.kind;
            pending.push(async move {
                let result = client.catalog().list_tracks(kind, &id).await;
                (id, result)
            });
        }

        while let Some((id, result)) = pending.next().await {
            self.catalog.finish_loading(&id);
            match result {
                Ok(response) => {
                    self.catalog.set_quota(response.quota);
                    self.selection.reconcile_loaded(&id, &response.tracks);
                    self.catalog.insert_tracks(&id, response.tracks);
                }
                Err(e) => self.note_failure("Failed to fetch tracks", &e),
            }
        }
    }

    /// Select or deselect every collection, fetching missing track lists so
    /// the sweep can complete once they arrive.
    pub async fn select_all_collections(&mut self, checked: bool) {
        let needs_fetch =
            self.selection
                .set_all_collections(self.catalog.collections(), self.catalog.tracks(), checked);
        if checked {
            self.load_tracks_batch(needs_fetch).await;
        }
    }

    /// Select or deselect one collection, fetching its tracks if needed.
    pub async fn select_collection(&mut self, id: &CollectionId, checked: bool) {
        let needs_fetch = self
            .selection
            .set_collection(id, self.catalog.tracks_for(id), checked);
        if needs_fetch {
            self.load_tracks(id).await;
        }
    }

    /// Toggle one track.
    pub fn select_track(&mut self, collection_id: &CollectionId, track_id: &TrackId, checked: bool) {
        self.selection.set_track(collection_id, track_id, checked);
    }

    /// Build the export snapshot from the current selection. Recomputed
    /// fresh on every call.
    pub fn export_snapshot(&self) -> Vec<SelectionEntry> {
        self.selection
            .export_snapshot(self.catalog.collections(), self.catalog.tracks())
    }

    /// Request an export of the current selection.
    ///
    /// An empty selection fails locally before any request. On success the
    /// quota snapshot from the response header, when present, replaces the
    /// current one.
    pub async fn download(&mut self, format: ExportFormat) -> Result<ExportDownload> {
        let snapshot = self.export_snapshot();
        match self.client.export().download(&snapshot, format).await {
            Ok(download) => {
                if download.quota.is_some() {
                    self.catalog.set_quota(download.quota.clone());
                }
                Ok(download)
            }
            Err(e) => {
                self.note_failure("Failed to download file. Please try again.", &e);
                Err(e.into())
            }
        }
    }

    /// Drop the session: clear the stored credential and all derived state.
    /// Purely local.
    pub fn logout(&mut self) {
        self.client.logout();
        self.login_deadline = None;
        self.force_unauthenticated(None);
    }

    /// Apply any queued auth events from the transport layer (a 401 seen by
    /// any request path invalidates this session).
    pub fn absorb_auth_events(&mut self) {
        loop {
            match self.auth_events.try_recv() {
                Ok(AuthEvent::Expired) => {
                    if self.state != AuthState::Unauthenticated {
                        self.force_unauthenticated(Some(
                            "Session expired. Please log in again.".to_string(),
                        ));
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    /// Passive status check with the login-settling retry schedule: up to
    /// three retries at 1s, 2s, 3s, then settle unauthenticated.
    async fn check_status(&mut self) {
        self.state = AuthState::Checking;
        let mut attempt = 0;
        loop {
            match self.client.status().await {
                Ok(status) if status.authenticated => {
                    self.enter_authenticated(status.quota).await;
                    return;
                }
                Ok(_) => debug!(attempt = attempt + 1, "Backend reports unauthenticated"),
                Err(e) => warn!(attempt = attempt + 1, error = %e, "Status check failed"),
            }

            if attempt < STATUS_RETRY_DELAYS.len() {
                let delay = STATUS_RETRY_DELAYS[attempt];
                debug!(?delay, "Retrying status check");
                tokio::time::sleep(delay).await;
                attempt += 1;
            } else {
                self.force_unauthenticated(None);
                return;
            }
        }
    }

    async fn apply_completion(&mut self, completion: AuthCompletion) {
        if completion.success {
            if let Some(token) = completion.token.as_deref() {
                if let Err(e) = self.client.token_store().set_token(token) {
                    warn!(error = %e, "Failed to persist delivered credential");
                }
            }
            info!("Login completed");
            self.enter_authenticated(None).await;
        } else {
            let error = completion
                .error
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(error = %error, "Login failed");
            self.force_unauthenticated(Some(format!("Authentication failed: {error}")));
        }
    }

    async fn enter_authenticated(&mut self, quota: Option<UserQuota>) {
        self.state = AuthState::Authenticated;
        self.login_deadline = None;
        self.last_error = None;
        self.catalog.set_quota(quota);
        self.load_collections().await;
    }

    fn force_unauthenticated(&mut self, message: Option<String>) {
        self.state = AuthState::Unauthenticated;
        self.catalog.clear();
        self.selection.clear();
        self.last_error = message;
    }

    /// Fold a client error into the session: 401 deauthenticates and clears
    /// derived state, 429 surfaces the reset hint, local validation errors
    /// surface verbatim, everything else gets the caller's fallback text.
    fn note_failure(&mut self, fallback: &str, err: &CollectorClientError) {
        match err {
            CollectorClientError::AuthExpired => {
                self.force_unauthenticated(Some("Session expired. Please log in again.".to_string()));
            }
            CollectorClientError::RateLimited { .. } => {
                self.last_error = err.rate_limit_hint();
            }
            CollectorClientError::Validation(message) => {
                self.last_error = Some(message.clone());
            }
            _ => {
                warn!(error = %err, "{fallback}");
                self.last_error = Some(fallback.to_string());
            }
        }
    }
}
