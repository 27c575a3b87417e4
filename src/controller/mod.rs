//! Key table controller — the single source of truth for the dashboard.
//!
//! `KeyTableController` owns the signed-in user's API keys, routes every
//! create/update/delete through the record store, keeps the sort state,
//! and drives the transient row markers. It never retries and never
//! lets a store failure escape: failures become a notification plus a
//! recorded error message, and the in-memory collection only changes
//! after the store confirms.
//!
//! Operations are independent futures. Nothing serializes them, so when
//! two mutations race, whichever response lands last is what the table
//! shows.

pub mod markers;
pub mod notify;
pub mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clipboard::Clipboard;
use crate::errors::{KeydashError, Result};
use crate::identity::IdentityProvider;
use crate::keys::mask::DEFAULT_PUBLIC_PREFIXES;
use crate::keys::{
    mask_secret, ApiKeyPatch, ApiKeyRecord, KeyCandidate, PlanUsage, SortColumn, SortState,
    SortedView,
};
use crate::store::RecordStore;

pub use markers::{MarkerKind, TransientMarkers, DEFAULT_MARKER_TTL};
pub use notify::{Notification, NotificationKind, Severity};
pub use state::{Dialog, Outcome, TableSnapshot};

/// Buffered notifications per subscriber before the oldest are dropped.
const NOTIFICATION_CAPACITY: usize = 64;

/// Tunables for a [`KeyTableController`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub marker_ttl: Duration,
    pub initial_sort: SortState,
    pub public_prefixes: Vec<String>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            marker_ttl: DEFAULT_MARKER_TTL,
            initial_sort: SortState::default(),
            public_prefixes: DEFAULT_PUBLIC_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct TableState {
    user_id: Option<String>,
    records: Vec<ApiKeyRecord>,
    loading: bool,
    error: Option<String>,
    sort: SortState,
    dialog: Dialog,
}

impl TableState {
    /// Insert `record`, replacing any row with the same id.
    fn upsert(&mut self, record: ApiKeyRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    fn close_dialog_for(&mut self, id: &str) {
        if self.dialog.record_id() == Some(id) {
            self.dialog = Dialog::Closed;
        }
    }
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    clipboard: Arc<dyn Clipboard>,
    state: Mutex<TableState>,
    revision: Arc<watch::Sender<u64>>,
    notifications: broadcast::Sender<Notification>,
    markers: TransientMarkers,
    public_prefixes: Vec<String>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the table and tell subscribers about it.
    fn mutate<R>(&self, f: impl FnOnce(&mut TableState) -> R) -> R {
        let result = f(&mut self.state());
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
        result
    }

    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            warn!(kind = ?notification.kind, "{}", notification.message);
        } else {
            info!(kind = ?notification.kind, "{}", notification.message);
        }
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }

    /// Record a store failure and raise `notification`.
    fn fail(&self, message: &str, notification: Notification) {
        self.mutate(|s| s.error = Some(message.to_string()));
        self.notify(notification);
    }
}

/// Clears the loading flag when dropped, on every exit path.
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> LoadingGuard<'a> {
    fn start(inner: &'a Inner) -> Self {
        inner.mutate(|s| s.loading = true);
        Self { inner }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.inner.mutate(|s| s.loading = false);
    }
}

/// Owns the API-key table for the signed-in user.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone)]
pub struct KeyTableController {
    inner: Arc<Inner>,
}

impl KeyTableController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        clipboard: Arc<dyn Clipboard>,
        options: ControllerOptions,
    ) -> Self {
        let (revision, _) = watch::channel(0u64);
        let revision = Arc::new(revision);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let markers = TransientMarkers::new(options.marker_ttl, Arc::clone(&revision));

        let state = TableState {
            user_id: identity.current_user(),
            sort: options.initial_sort,
            ..TableState::default()
        };

        Self {
            inner: Arc::new(Inner {
                store,
                identity,
                clipboard,
                state: Mutex::new(state),
                revision,
                notifications,
                markers,
                public_prefixes: options.public_prefixes,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Store-backed operations
    // ------------------------------------------------------------------

    /// Replace the collection with everything the store holds for the
    /// signed-in user. A no-op when nobody is signed in.
    ///
    /// On failure the previous collection is kept as-is. A response that
    /// arrives after the session moved to another user is dropped and
    /// reported as `Skipped`.
    pub async fn load(&self) -> Outcome<usize> {
        let Some(user_id) = self.inner.identity.current_user() else {
            debug!("load skipped: no signed-in user");
            return Outcome::Skipped;
        };

        self.inner.mutate(|s| {
            if s.user_id.as_deref() != Some(user_id.as_str()) {
                s.records.clear();
                s.user_id = Some(user_id.clone());
            }
        });

        let _loading = LoadingGuard::start(&self.inner);
        debug!(user_id = %user_id, "loading api keys");

        match self.inner.store.list(&user_id).await {
            Ok(records) => {
                let count = records.len();
                let applied = self.inner.mutate(|s| {
                    // A response for a user who has since signed out is stale.
                    if s.user_id.as_deref() != Some(user_id.as_str()) {
                        return false;
                    }
                    s.records = records;
                    s.error = None;
                    true
                });
                if !applied {
                    debug!(user_id = %user_id, "discarded load for previous session");
                    return Outcome::Skipped;
                }
                info!(user_id = %user_id, count, "api keys loaded");
                Outcome::Done(count)
            }
            Err(e) => {
                if !self.is_current_user(&user_id) {
                    debug!(user_id = %user_id, error = %e, "discarded failed load for previous session");
                    return Outcome::Skipped;
                }
                let message = e.to_string();
                self.inner
                    .fail(&message, Notification::load_failed(&message));
                Outcome::Failed(message)
            }
        }
    }

    /// Insert a new key built from the create form.
    ///
    /// On success the store's record is appended, the create dialog is
    /// closed and the row gets an `Added` marker. On failure the
    /// collection and dialog are left alone so the user can retry.
    pub async fn create(&self, candidate: &KeyCandidate) -> Result<Outcome<ApiKeyRecord>> {
        let user_id = self
            .inner
            .identity
            .current_user()
            .ok_or(KeydashError::NoSession)?;
        let payload = candidate.to_new_record(&user_id)?;

        self.inner.mutate(|s| s.error = None);
        let _loading = LoadingGuard::start(&self.inner);
        debug!(user_id = %user_id, name = %payload.name, "creating api key");

        match self.inner.store.insert(payload).await {
            Ok(record) => {
                self.inner.mutate(|s| {
                    if s.user_id.is_none() {
                        s.user_id = Some(record.owner_id.clone());
                    }
                    if s.user_id.as_deref() == Some(record.owner_id.as_str()) {
                        s.upsert(record.clone());
                    }
                    if s.dialog == Dialog::Create {
                        s.dialog = Dialog::Closed;
                    }
                });
                self.inner.markers.attach(&record.id, MarkerKind::Added);
                self.inner.notify(Notification::created(&record.name));
                Ok(Outcome::Done(record))
            }
            Err(e) => {
                let message = e.to_string();
                self.inner
                    .fail(&message, Notification::create_failed(&message));
                Ok(Outcome::Failed(message))
            }
        }
    }

    /// Send `patch` for `id` and swap the stored result into the table.
    ///
    /// Only the matching row changes; the rest of the collection is not
    /// reloaded. On failure the edit dialog stays open.
    pub async fn update(&self, id: &str, patch: ApiKeyPatch) -> Result<Outcome<ApiKeyRecord>> {
        patch.validate()?;
        debug!(id, "updating api key");

        match self.inner.store.update(id, patch).await {
            Ok(record) => {
                self.inner.mutate(|s| {
                    if let Some(existing) = s.records.iter_mut().find(|r| r.id == record.id) {
                        *existing = record.clone();
                    }
                    if matches!(&s.dialog, Dialog::Edit { id: open } if open == id) {
                        s.dialog = Dialog::Closed;
                    }
                    s.error = None;
                });
                self.inner.notify(Notification::updated(&record.name));
                Ok(Outcome::Done(record))
            }
            Err(e) => {
                let message = e.to_string();
                self.inner
                    .fail(&message, Notification::update_failed(&message));
                Ok(Outcome::Failed(message))
            }
        }
    }

    /// Delete `id` in the store, then drop it from the table.
    ///
    /// The row is only removed after the store confirms. Deleting an id
    /// that is not in the table still calls the store.
    pub async fn delete(&self, id: &str) -> Outcome<()> {
        debug!(id, "deleting api key");

        match self.inner.store.delete(id).await {
            Ok(()) => {
                self.inner.mutate(|s| {
                    s.records.retain(|r| r.id != id);
                    s.close_dialog_for(id);
                    s.error = None;
                });
                self.inner.notify(Notification::deleted());
                Outcome::Done(())
            }
            Err(e) => {
                let message = e.to_string();
                self.inner
                    .fail(&message, Notification::delete_failed(&message));
                Outcome::Failed(message)
            }
        }
    }

    // ------------------------------------------------------------------
    // Local operations
    // ------------------------------------------------------------------

    /// Copy the key material of `id` to the clipboard and mark the row.
    pub async fn copy(&self, id: &str) -> Result<()> {
        let secret = self.find(id)?.secret;
        self.inner.clipboard.write_text(&secret)?;
        self.inner.markers.attach(id, MarkerKind::Copied);
        self.inner.notify(Notification::copied());
        Ok(())
    }

    /// "Copy to clipboard" from the view dialog: copy, then close it.
    pub async fn copy_and_close(&self, id: &str) -> Result<()> {
        self.copy(id).await?;
        self.inner.mutate(|s| s.close_dialog_for(id));
        Ok(())
    }

    /// Advance the sort state for a click on `column`.
    pub fn set_sort(&self, column: SortColumn) -> SortState {
        self.inner.mutate(|s| {
            s.sort = s.sort.advance(column);
            s.sort
        })
    }

    pub fn sort_state(&self) -> SortState {
        self.inner.state().sort
    }

    /// The collection in current sort order.
    pub fn sorted_view(&self) -> SortedView {
        let s = self.inner.state();
        SortedView::new(s.records.clone(), s.sort)
    }

    /// Masked key material for the table cell.
    pub fn display_secret(&self, record: &ApiKeyRecord) -> String {
        mask_secret(&record.secret, &self.inner.public_prefixes)
    }

    // ------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------

    pub fn dialog(&self) -> Dialog {
        self.inner.state().dialog.clone()
    }

    pub fn open_create_dialog(&self) {
        self.inner.mutate(|s| s.dialog = Dialog::Create);
    }

    /// Open the edit form for `id`, returning its pre-filled values.
    pub fn open_edit_dialog(&self, id: &str) -> Result<KeyCandidate> {
        let record = self.find(id)?;
        self.inner.mutate(|s| {
            s.dialog = Dialog::Edit {
                id: id.to_string(),
            }
        });
        Ok(KeyCandidate::from_record(&record))
    }

    /// Open the full-secret view for `id`.
    pub fn open_view_dialog(&self, id: &str) -> Result<ApiKeyRecord> {
        let record = self.find(id)?;
        self.inner.mutate(|s| {
            s.dialog = Dialog::View {
                id: id.to_string(),
            }
        });
        Ok(record)
    }

    pub fn close_dialog(&self) {
        self.inner.mutate(|s| s.dialog = Dialog::Closed);
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Follow the identity provider: sign-out clears the table, sign-in
    /// (or a user switch) clears it and loads the new user's keys.
    ///
    /// The task ends once the controller or the identity provider is gone.
    pub fn watch_session(&self) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let mut session = self.inner.identity.subscribe();

        tokio::spawn(async move {
            while session.changed().await.is_ok() {
                let user_id = session.borrow_and_update().clone();
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let controller = KeyTableController { inner };
                controller.reset(user_id.as_deref());
                if user_id.is_some() {
                    let _ = controller.load().await;
                }
            }
        })
    }

    /// Discard everything tied to the previous session.
    fn reset(&self, user_id: Option<&str>) {
        info!(user_id = ?user_id, "session changed, discarding api keys");
        self.inner.markers.clear();
        self.inner.mutate(|s| {
            s.user_id = user_id.map(str::to_string);
            s.records.clear();
            s.error = None;
            s.dialog = Dialog::Closed;
        });
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Change signal: the value is a revision counter bumped on every
    /// table or marker change. Pull [`snapshot`](Self::snapshot) after
    /// it fires.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let revision = *self.inner.revision.borrow();
        let markers = self.inner.markers.snapshot();
        let s = self.inner.state();
        TableSnapshot {
            revision,
            user_id: s.user_id.clone(),
            view: SortedView::new(s.records.clone(), s.sort),
            loading: s.loading,
            error: s.error.clone(),
            dialog: s.dialog.clone(),
            markers,
        }
    }

    /// Records in collection order (as fetched, creates appended).
    pub fn records(&self) -> Vec<ApiKeyRecord> {
        self.inner.state().records.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.state().user_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state().error.clone()
    }

    pub fn marker(&self, id: &str) -> Option<MarkerKind> {
        self.inner.markers.get(id)
    }

    /// Combined usage of the loaded keys against a plan limit.
    pub fn plan_usage(&self, plan_name: &str, limit: u64) -> PlanUsage {
        PlanUsage::from_records(plan_name, limit, &self.inner.state().records)
    }

    fn is_current_user(&self, user_id: &str) -> bool {
        self.inner.state().user_id.as_deref() == Some(user_id)
    }

    fn find(&self, id: &str) -> Result<ApiKeyRecord> {
        self.inner
            .state()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| KeydashError::KeyNotFound(id.to_string()))
    }
}
