//! Behavioural tests for the key table controller, run against the
//! in-memory store with a call log and an optional gate on `list`.

use std::num::NonZeroU64;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Notify;

use keydash::clipboard::MemoryClipboard;
use keydash::controller::{
    ControllerOptions, Dialog, KeyTableController, MarkerKind, NotificationKind, Outcome,
};
use keydash::errors::{KeydashError, StoreError};
use keydash::identity::SessionIdentity;
use keydash::keys::{
    ApiKeyPatch, ApiKeyRecord, KeyCandidate, NewApiKeyRecord, SortColumn, SortDirection,
    SortState,
};
use keydash::store::{MemoryStore, RecordStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Memory store that logs every call and can hold `list` for one owner
/// until released.
#[derive(Debug, Clone, Default)]
struct ScriptedStore {
    inner: MemoryStore,
    calls: Arc<Mutex<Vec<String>>>,
    gate: Arc<Mutex<Option<(String, Arc<Notify>)>>>,
}

impl ScriptedStore {
    fn with_records(records: Vec<ApiKeyRecord>) -> Self {
        Self {
            inner: MemoryStore::with_records(records),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Hold `list(owner)` until the returned handle is notified.
    fn gate_list(&self, owner: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((owner.to_string(), Arc::clone(&notify)));
        notify
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        self.log(format!("list:{owner_id}"));
        let gate = self
            .gate
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, notify)| Arc::clone(notify));
        if let Some(notify) = gate {
            notify.notified().await;
        }
        self.inner.list(owner_id).await
    }

    async fn insert(&self, record: NewApiKeyRecord) -> Result<ApiKeyRecord, StoreError> {
        self.log(format!("insert:{}", record.name));
        self.inner.insert(record).await
    }

    async fn update(&self, id: &str, patch: ApiKeyPatch) -> Result<ApiKeyRecord, StoreError> {
        self.log(format!("update:{id}"));
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.log(format!("delete:{id}"));
        self.inner.delete(id).await
    }
}

fn record(id: &str, owner: &str, name: &str, secret: &str, limit: Option<u64>, usage: u64) -> ApiKeyRecord {
    ApiKeyRecord {
        id: id.to_string(),
        owner_id: owner.to_string(),
        name: name.to_string(),
        secret: secret.to_string(),
        monthly_limit: limit.and_then(NonZeroU64::new),
        usage_count: usage,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

fn seed() -> Vec<ApiKeyRecord> {
    vec![
        record("1", "u1", "Production", "pk_live_abc123", Some(1000), 24),
        record("2", "u1", "Development", "sk_test_xyz", None, 300),
        record("3", "u2", "Other user", "pk_live_other", Some(900), 5),
    ]
}

struct Harness {
    store: ScriptedStore,
    identity: Arc<SessionIdentity>,
    clipboard: Arc<MemoryClipboard>,
    controller: KeyTableController,
}

fn harness_with(store: ScriptedStore, identity: SessionIdentity) -> Harness {
    let identity = Arc::new(identity);
    let clipboard = Arc::new(MemoryClipboard::new());
    let controller = KeyTableController::new(
        Arc::new(store.clone()),
        identity.clone(),
        clipboard.clone(),
        ControllerOptions::default(),
    );
    Harness {
        store,
        identity,
        clipboard,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(
        ScriptedStore::with_records(seed()),
        SessionIdentity::signed_in("u1"),
    )
}

fn names(controller: &KeyTableController) -> Vec<String> {
    controller.sorted_view().iter().map(|r| r.name.clone()).collect()
}

/// Poll `cond` until it holds or a second has passed.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_replaces_collection_with_owned_records() {
    let h = harness();
    assert_eq!(h.controller.load().await, Outcome::Done(2));

    let ids: Vec<String> = h.controller.records().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert!(!h.controller.is_loading());
    assert!(h.controller.error().is_none());
    assert_eq!(h.controller.user_id().as_deref(), Some("u1"));
}

#[tokio::test]
async fn load_without_session_does_nothing() {
    let h = harness_with(ScriptedStore::with_records(seed()), SessionIdentity::signed_out());
    assert_eq!(h.controller.load().await, Outcome::Skipped);
    assert!(h.store.calls().is_empty());
    assert!(h.controller.records().is_empty());
}

#[tokio::test]
async fn failed_load_keeps_previous_collection() {
    let h = harness();
    let mut notices = h.controller.notifications();
    let _ = h.controller.load().await;

    h.store.inner.set_should_fail(true);
    let outcome = h.controller.load().await;

    assert!(outcome.is_failed());
    assert_eq!(h.controller.records().len(), 2);
    assert!(h.controller.error().is_some());
    assert!(!h.controller.is_loading());

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.kind, NotificationKind::LoadFailed);
    assert!(notice.is_error());
}

#[tokio::test]
async fn loading_flag_is_set_while_waiting_for_the_store() {
    let h = harness();
    let gate = h.store.gate_list("u1");

    let pending = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.load().await }
    });

    wait_until(|| h.store.count("list:") == 1).await;
    assert!(h.controller.is_loading());

    gate.notify_one();
    assert_eq!(pending.await.unwrap(), Outcome::Done(2));
    assert!(!h.controller.is_loading());
}

#[tokio::test]
async fn response_for_previous_user_is_discarded() {
    let h = harness();
    let gate = h.store.gate_list("u1");

    let stale = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.load().await }
    });
    wait_until(|| h.store.count("list:u1") == 1).await;

    h.identity.sign_in("u2");
    assert_eq!(h.controller.load().await, Outcome::Done(1));

    gate.notify_one();
    assert_eq!(stale.await.unwrap(), Outcome::Skipped);

    let owners: Vec<String> = h.controller.records().into_iter().map(|r| r.owner_id).collect();
    assert_eq!(owners, vec!["u2"]);
}

#[tokio::test]
async fn failed_response_for_previous_user_is_discarded() {
    let h = harness();
    let mut notices = h.controller.notifications();
    let gate = h.store.gate_list("u1");

    let stale = tokio::spawn({
        let controller = h.controller.clone();
        async move { controller.load().await }
    });
    wait_until(|| h.store.count("list:u1") == 1).await;

    h.identity.sign_in("u2");
    assert_eq!(h.controller.load().await, Outcome::Done(1));

    h.store.inner.set_should_fail(true);
    gate.notify_one();
    assert_eq!(stale.await.unwrap(), Outcome::Skipped);

    assert!(h.controller.error().is_none());
    assert_eq!(h.controller.records().len(), 1);
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn reload_picks_up_server_side_usage() {
    let h = harness();
    let _ = h.controller.load().await;
    assert_eq!(h.controller.records()[0].usage_count, 24);

    h.store.inner.set_usage("1", 750).await;
    // Nothing changes locally until the next load.
    assert_eq!(h.controller.records()[0].usage_count, 24);

    assert_eq!(h.controller.load().await, Outcome::Done(2));
    assert_eq!(h.controller.records()[0].usage_count, 750);
    assert_eq!(h.controller.plan_usage("Professional", 1000).used, 1050);
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_appends_stored_record_and_closes_dialog() {
    let h = harness();
    let mut notices = h.controller.notifications();
    let _ = h.controller.load().await;
    h.controller.open_create_dialog();

    let candidate = KeyCandidate::new("Staging", "pk_live_new", Some(500));
    let stored = h.controller.create(&candidate).await.unwrap().done().unwrap();

    assert_eq!(stored.usage_count, 0);
    assert_eq!(stored.owner_id, "u1");
    assert_eq!(h.controller.records().last(), Some(&stored));
    assert_eq!(h.controller.dialog(), Dialog::Closed);
    assert_eq!(h.controller.marker(&stored.id), Some(MarkerKind::Added));

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.kind, NotificationKind::Created);
    assert!(notice.message.contains("Staging"));
}

#[tokio::test]
async fn failed_create_keeps_dialog_open_and_collection_unchanged() {
    let h = harness();
    let _ = h.controller.load().await;
    let before = h.controller.records();
    h.controller.open_create_dialog();

    h.store.inner.set_should_fail(true);
    let outcome = h
        .controller
        .create(&KeyCandidate::new("Staging", "pk_live_new", None))
        .await
        .unwrap();

    assert!(outcome.is_failed());
    assert_eq!(h.controller.records(), before);
    assert_eq!(h.controller.dialog(), Dialog::Create);
    assert!(h.controller.error().is_some());
}

#[tokio::test]
async fn invalid_candidate_never_reaches_the_store() {
    let h = harness();
    let err = h
        .controller
        .create(&KeyCandidate::new("   ", "pk_live_new", None))
        .await
        .unwrap_err();
    assert!(matches!(err, KeydashError::Validation(_)));

    let err = h
        .controller
        .create(&KeyCandidate::new("Name", "pk_live_new", Some(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, KeydashError::Validation(_)));

    assert_eq!(h.store.count("insert:"), 0);
}

#[tokio::test]
async fn create_without_session_is_an_error() {
    let h = harness_with(ScriptedStore::default(), SessionIdentity::signed_out());
    let err = h
        .controller
        .create(&KeyCandidate::new("Name", "k", None))
        .await
        .unwrap_err();
    assert!(matches!(err, KeydashError::NoSession));
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_replaces_only_the_matching_row() {
    let h = harness();
    let _ = h.controller.load().await;
    let untouched = h.controller.records()[1].clone();

    let current = h.controller.open_edit_dialog("1").unwrap();
    assert_eq!(current.name, "Production");
    assert_eq!(h.controller.dialog(), Dialog::Edit { id: "1".into() });

    let patch = KeyCandidate::new("Prod (renamed)", current.secret.clone(), None)
        .to_patch()
        .unwrap();
    let updated = h.controller.update("1", patch).await.unwrap().done().unwrap();

    assert_eq!(updated.name, "Prod (renamed)");
    assert_eq!(updated.monthly_limit, None);
    assert_eq!(updated.usage_count, 24);

    let records = h.controller.records();
    assert_eq!(records[0], updated);
    assert_eq!(records[1], untouched);
    assert_eq!(h.controller.dialog(), Dialog::Closed);
    // No reload after a successful update.
    assert_eq!(h.store.count("list:"), 1);
}

#[tokio::test]
async fn failed_update_leaves_row_and_dialog() {
    let h = harness();
    let _ = h.controller.load().await;
    let _ = h.controller.open_edit_dialog("1").unwrap();
    let before = h.controller.records();

    h.store.inner.set_should_fail(true);
    let patch = ApiKeyPatch {
        name: Some("Nope".into()),
        ..ApiKeyPatch::default()
    };
    assert!(h.controller.update("1", patch).await.unwrap().is_failed());

    assert_eq!(h.controller.records(), before);
    assert_eq!(h.controller.dialog(), Dialog::Edit { id: "1".into() });
}

#[tokio::test]
async fn empty_patch_is_rejected() {
    let h = harness();
    let err = h
        .controller
        .update("1", ApiKeyPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, KeydashError::Validation(_)));
    assert_eq!(h.store.count("update:"), 0);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_row_after_store_confirms() {
    let h = harness();
    let mut notices = h.controller.notifications();
    let _ = h.controller.load().await;
    let _ = h.controller.open_view_dialog("2").unwrap();

    assert_eq!(h.controller.delete("2").await, Outcome::Done(()));

    assert_eq!(names(&h.controller), vec!["Production"]);
    assert_eq!(h.controller.dialog(), Dialog::Closed);
    assert_eq!(notices.try_recv().unwrap().kind, NotificationKind::Deleted);
}

#[tokio::test]
async fn delete_of_unknown_id_still_calls_the_store() {
    let h = harness();
    let _ = h.controller.load().await;

    assert_eq!(h.controller.delete("nope").await, Outcome::Done(()));
    assert_eq!(h.store.count("delete:nope"), 1);
    assert_eq!(h.controller.records().len(), 2);
}

#[tokio::test]
async fn failed_delete_keeps_the_row() {
    let h = harness();
    let _ = h.controller.load().await;

    h.store.inner.set_should_fail(true);
    assert!(h.controller.delete("1").await.is_failed());
    assert_eq!(h.controller.records().len(), 2);
    assert!(h.controller.error().is_some());
}

#[tokio::test]
async fn create_update_delete_sequence() {
    let h = harness_with(ScriptedStore::default(), SessionIdentity::signed_in("u1"));
    let _ = h.controller.load().await;

    let created = h
        .controller
        .create(&KeyCandidate::new("A", "pk_live_a", None))
        .await
        .unwrap()
        .done()
        .unwrap();
    let patch = ApiKeyPatch {
        monthly_limit: Some(NonZeroU64::new(50)),
        ..ApiKeyPatch::default()
    };
    let _ = h.controller.update(&created.id, patch).await.unwrap();
    let _ = h.controller.delete(&created.id).await;

    assert!(h.controller.records().is_empty());
    assert!(h.store.inner.all().await.is_empty());
    assert_eq!(
        h.store.calls(),
        vec![
            "list:u1".to_string(),
            "insert:A".to_string(),
            format!("update:{}", created.id),
            format!("delete:{}", created.id),
        ]
    );
}

// ---------------------------------------------------------------------------
// Copy and markers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn copy_puts_full_key_on_clipboard() {
    let h = harness();
    let mut notices = h.controller.notifications();
    let _ = h.controller.load().await;

    h.controller.copy("1").await.unwrap();

    assert_eq!(h.clipboard.contents().as_deref(), Some("pk_live_abc123"));
    assert_eq!(h.controller.marker("1"), Some(MarkerKind::Copied));
    assert_eq!(notices.try_recv().unwrap().kind, NotificationKind::Copied);
}

#[tokio::test]
async fn copy_of_unknown_id_fails() {
    let h = harness();
    let _ = h.controller.load().await;
    let err = h.controller.copy("nope").await.unwrap_err();
    assert!(matches!(err, KeydashError::KeyNotFound(_)));
    assert!(h.clipboard.contents().is_none());
}

#[tokio::test]
async fn copy_and_close_closes_the_view_dialog() {
    let h = harness();
    let _ = h.controller.load().await;
    let shown = h.controller.open_view_dialog("2").unwrap();
    assert_eq!(shown.secret, "sk_test_xyz");

    h.controller.copy_and_close("2").await.unwrap();
    assert_eq!(h.controller.dialog(), Dialog::Closed);
    assert_eq!(h.clipboard.contents().as_deref(), Some("sk_test_xyz"));
}

#[tokio::test(start_paused = true)]
async fn copied_marker_expires() {
    let h = harness();
    let _ = h.controller.load().await;

    h.controller.copy("1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.controller.marker("1"), Some(MarkerKind::Copied));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.controller.marker("1"), None);
}

#[tokio::test(start_paused = true)]
async fn later_marker_on_same_row_gets_a_full_lifetime() {
    let store = ScriptedStore::default();
    let h = harness_with(store, SessionIdentity::signed_in("u1"));
    let created = h
        .controller
        .create(&KeyCandidate::new("A", "pk_live_a", None))
        .await
        .unwrap()
        .done()
        .unwrap();
    assert_eq!(h.controller.marker(&created.id), Some(MarkerKind::Added));

    tokio::time::sleep(Duration::from_millis(300)).await;
    h.controller.copy(&created.id).await.unwrap();

    // Past the first marker's expiry, inside the second's.
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(h.controller.marker(&created.id), Some(MarkerKind::Copied));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.controller.marker(&created.id), None);
}

// ---------------------------------------------------------------------------
// Sorting and display
// ---------------------------------------------------------------------------

#[tokio::test]
async fn table_opens_sorted_by_name_ascending() {
    let h = harness();
    let _ = h.controller.load().await;
    assert_eq!(
        h.controller.sort_state(),
        SortState::new(SortColumn::Name, SortDirection::Ascending)
    );
    assert_eq!(names(&h.controller), vec!["Development", "Production"]);
}

#[tokio::test]
async fn clicking_a_column_cycles_its_direction() {
    let h = harness();
    let _ = h.controller.load().await;

    let state = h.controller.set_sort(SortColumn::UsageCount);
    assert_eq!(state, SortState::new(SortColumn::UsageCount, SortDirection::Ascending));
    assert_eq!(names(&h.controller), vec!["Production", "Development"]);

    let state = h.controller.set_sort(SortColumn::UsageCount);
    assert_eq!(state.direction, SortDirection::Descending);

    let state = h.controller.set_sort(SortColumn::UsageCount);
    assert!(!state.is_active());
    // Unsorted shows collection order.
    assert_eq!(names(&h.controller), vec!["Production", "Development"]);

    // The collection itself is never reordered.
    let ids: Vec<String> = h.controller.records().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn numeric_columns_compare_as_text() {
    let h = harness_with(
        ScriptedStore::with_records(vec![
            record("a", "u1", "nine hundred", "k1", Some(900), 0),
            record("b", "u1", "one thousand", "k2", Some(1000), 0),
        ]),
        SessionIdentity::signed_in("u1"),
    );
    let _ = h.controller.load().await;
    let _ = h.controller.set_sort(SortColumn::MonthlyLimit);
    assert_eq!(names(&h.controller), vec!["one thousand", "nine hundred"]);
}

#[tokio::test]
async fn display_secret_masks_by_prefix() {
    let h = harness();
    let _ = h.controller.load().await;
    let records = h.controller.records();
    assert_eq!(h.controller.display_secret(&records[0]), "pk_live_******");
    assert_eq!(h.controller.display_secret(&records[1]), "sk_********");
}

#[tokio::test]
async fn plan_usage_sums_loaded_keys() {
    let h = harness();
    let _ = h.controller.load().await;
    let plan = h.controller.plan_usage("Professional", 1000);
    assert_eq!(plan.used, 324);
    assert_eq!(plan.label(), "324/1,000 Requests");
}

// ---------------------------------------------------------------------------
// Session and observation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_changes_reset_and_reload() {
    let h = harness();
    let _ = h.controller.load().await;
    let watcher = h.controller.watch_session();

    h.identity.sign_out();
    wait_until(|| h.controller.user_id().is_none()).await;
    assert!(h.controller.records().is_empty());

    h.identity.sign_in("u2");
    wait_until(|| h.controller.records().len() == 1).await;
    assert_eq!(h.controller.records()[0].name, "Other user");
    assert_eq!(h.controller.user_id().as_deref(), Some("u2"));

    watcher.abort();
}

#[tokio::test]
async fn watcher_ends_when_controller_is_dropped() {
    let h = harness();
    let watcher = h.controller.watch_session();
    let Harness {
        controller,
        identity,
        ..
    } = h;
    drop(controller);

    identity.sign_out();
    tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .expect("watcher should stop")
        .unwrap();
}

#[tokio::test]
async fn every_change_bumps_the_revision() {
    let h = harness();
    let mut changes = h.controller.subscribe();
    let start = *changes.borrow_and_update();

    let _ = h.controller.load().await;
    assert!(changes.has_changed().unwrap());
    let after_load = *changes.borrow_and_update();
    assert!(after_load > start);

    let _ = h.controller.set_sort(SortColumn::Secret);
    assert!(changes.has_changed().unwrap());

    let snapshot = h.controller.snapshot();
    assert!(snapshot.revision > after_load);
    assert_eq!(snapshot.sort().column, Some(SortColumn::Secret));
    assert_eq!(snapshot.rows().count(), 2);
}
