// Autosave session behavior against a scripted store.
//
// Saves block until the test completes them, so in-flight windows can be
// held open deterministically. Time is paused; the scheduler only moves when
// the test advances the clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use docsync_common::fingerprint::fingerprint;
use docsync_common::patch::{PatchField, SavePatch};
use docsync_common::types::{CreatedDocument, Document};
use docsync_engine::config::AutosaveConfig;
use docsync_engine::documents::Documents;
use docsync_engine::session::{EditorStatus, LeaveDecision, LeavePolicy, Session, SessionError};
use docsync_engine::store::{DocumentStore, StoreError};
use docsync_engine::view::EditorView;
use tokio::sync::oneshot;
use tokio::time;
use uuid::Uuid;

// ── Scripted store ──────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    documents: Vec<Document>,
    fetch_failures: usize,
    fetch_calls: usize,
    saves: Vec<SavePatch>,
    pending: VecDeque<oneshot::Sender<Result<(), StoreError>>>,
    auto_complete: bool,
}

#[derive(Clone, Default)]
struct ScriptedStore {
    script: Arc<Mutex<Script>>,
}

impl ScriptedStore {
    fn with_document(id: Uuid, content: &str) -> Self {
        let store = Self::default();
        store.lock().documents.push(Document::new(id, None, Some(content.into())));
        store
    }

    fn auto_complete(self) -> Self {
        self.lock().auto_complete = true;
        self
    }

    fn fail_fetches(self, count: usize) -> Self {
        self.lock().fetch_failures = count;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn saves(&self) -> Vec<SavePatch> {
        self.lock().saves.clone()
    }

    fn fetch_calls(&self) -> usize {
        self.lock().fetch_calls
    }

    fn complete_next(&self, result: Result<(), StoreError>) {
        let sender = self.lock().pending.pop_front().expect("no save waiting");
        let _ = sender.send(result);
    }
}

impl DocumentStore for ScriptedStore {
    async fn fetch_document(&self, id: Uuid) -> Result<Document, StoreError> {
        let mut script = self.lock();
        script.fetch_calls += 1;
        if script.fetch_failures > 0 {
            script.fetch_failures -= 1;
            return Err(StoreError::Transport { message: "connection refused".into() });
        }
        script.documents.iter().find(|d| d.id == id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn save_document(&self, patch: &SavePatch) -> Result<(), StoreError> {
        let rx = {
            let mut script = self.lock();
            script.saves.push(patch.clone());
            if script.auto_complete {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                script.pending.push_back(tx);
                Some(rx)
            }
        };
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(StoreError::Transport { message: "dropped".into() })),
            None => Ok(()),
        }
    }

    async fn create_document(&self) -> Result<CreatedDocument, StoreError> {
        let id = Uuid::new_v4();
        self.lock().documents.push(Document::empty(id));
        Ok(CreatedDocument { id })
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        let mut script = self.lock();
        let before = script.documents.len();
        script.documents.retain(|d| d.id != id);
        if script.documents.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.lock().documents.clone())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn autosave(debounce_ms: u64, fallback_interval_ms: u64) -> AutosaveConfig {
    AutosaveConfig { debounce_ms, fallback_interval_ms }
}

fn default_timing() -> AutosaveConfig {
    autosave(2_000, 10_000)
}

/// Let spawned loads, saves and the scheduler run to quiescence.
async fn drain() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn advance(ms: u64) {
    time::advance(Duration::from_millis(ms)).await;
    drain().await;
}

async fn open_hydrated(
    store: &ScriptedStore,
    id: Uuid,
    config: AutosaveConfig,
) -> Session<ScriptedStore> {
    let session = Session::open(Documents::new(store.clone()), id, config);
    drain().await;
    assert!(session.snapshot().hydrated);
    session
}

fn content(text: &str) -> PatchField<String> {
    PatchField::Set(text.into())
}

fn transient() -> Result<(), StoreError> {
    Err(StoreError::Server { status: 503, message: "unavailable".into() })
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn explicit_save_round_trip_leaves_session_clean() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;
    assert!(!session.is_dirty());

    session.update_content("AB");
    assert!(session.is_dirty());
    session.save();
    drain().await;

    assert_eq!(session.status(), EditorStatus::Saving);
    assert_eq!(store.saves(), vec![SavePatch::new(id).with_content(content("AB"))]);

    store.complete_next(Ok(()));
    drain().await;

    assert_eq!(session.status(), EditorStatus::Idle);
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn save_during_flight_replays_once_with_latest_content() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.update_content("AB");
    session.save();
    session.update_content("ABC");
    session.save();
    session.save();
    drain().await;

    // Still exactly one request outstanding.
    assert_eq!(store.saves().len(), 1);

    store.complete_next(Ok(()));
    drain().await;

    let saves = store.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].content, content("ABC"));
    assert_eq!(session.status(), EditorStatus::Saving);

    store.complete_next(Ok(()));
    drain().await;

    assert_eq!(store.saves().len(), 2);
    assert_eq!(session.status(), EditorStatus::Idle);
}

#[tokio::test]
async fn debounce_fires_once_after_last_edit() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "").auto_complete();
    let session = open_hydrated(&store, id, default_timing()).await;

    session.update_content("x");
    drain().await;
    advance(1_000).await;
    session.update_content("xy");
    drain().await;

    advance(1_999).await;
    assert!(store.saves().is_empty());

    advance(1).await;
    assert_eq!(store.saves(), vec![SavePatch::new(id).with_content(content("xy"))]);
    assert_eq!(session.status(), EditorStatus::Idle);
}

#[tokio::test]
async fn never_more_than_one_save_in_flight() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, autosave(100, 1_000)).await;

    session.update_content("AB");
    session.save();
    for step in 0..20 {
        session.update_content(format!("AB{step}"));
        session.save_title(&format!("title {step}"));
        advance(250).await;
        assert_eq!(store.saves().len(), 1);
    }

    store.complete_next(Ok(()));
    drain().await;

    let saves = store.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1].content, content("AB19"));
    assert_eq!(saves[1].title, PatchField::Set("title 19".into()));
}

// ── Titles ──────────────────────────────────────────────────────────

#[tokio::test]
async fn title_saves_immediately_without_content() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.save_title("  Plan  ");
    drain().await;

    assert_eq!(
        store.saves(),
        vec![SavePatch::new(id).with_title(PatchField::Set("Plan".into()))]
    );
    assert_eq!(session.title(), "  Plan  ");
}

#[tokio::test]
async fn blank_title_clears() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.save_title("   ");
    drain().await;

    assert_eq!(store.saves()[0].title, PatchField::Clear);
}

#[tokio::test]
async fn title_committed_mid_flight_is_sent_right_after() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.update_content("AB");
    session.save();
    session.save_title("Later");
    assert!(session.has_unsaved_changes());
    drain().await;

    store.complete_next(Ok(()));
    drain().await;

    let saves = store.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[1], SavePatch::new(id).with_title(PatchField::Set("Later".into())));
}

#[tokio::test]
async fn title_lost_to_failure_goes_out_with_next_save() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.save_title("Plan");
    drain().await;
    store.complete_next(transient());
    drain().await;

    assert_eq!(store.saves().len(), 1);
    assert!(session.snapshot().pending_title);

    session.save();
    drain().await;
    assert_eq!(store.saves()[1].title, PatchField::Set("Plan".into()));
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_save_keeps_session_dirty_and_retries_after_debounce() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.update_content("AB");
    session.save();
    drain().await;
    store.complete_next(transient());
    drain().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, EditorStatus::Dirty);
    assert!(snapshot.last_failure.is_some());
    assert_eq!(snapshot.error, None);

    advance(2_000).await;
    assert_eq!(store.saves().len(), 2);
    assert_eq!(store.saves()[1].content, content("AB"));

    store.complete_next(Ok(()));
    drain().await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, EditorStatus::Idle);
    assert_eq!(snapshot.last_failure, None);
}

#[tokio::test]
async fn rejected_save_waits_for_next_edit() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.update_content("AB");
    session.save();
    drain().await;
    store.complete_next(Err(StoreError::Server { status: 400, message: "bad request".into() }));
    drain().await;

    advance(2_000).await;
    assert_eq!(store.saves().len(), 1);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, EditorStatus::Dirty);
    assert!(snapshot.last_failure.is_some());

    session.update_content("ABC");
    advance(2_000).await;
    assert_eq!(store.saves().len(), 2);
    assert_eq!(store.saves()[1].content, content("ABC"));
}

#[tokio::test]
async fn not_found_stops_automatic_saves() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.update_content("AB");
    session.save();
    drain().await;
    store.complete_next(Err(StoreError::NotFound(id)));
    drain().await;

    assert_eq!(session.snapshot().error, Some(SessionError::NotFound(id)));

    session.update_content("ABC");
    session.save();
    advance(30_000).await;
    assert_eq!(store.saves().len(), 1);
}

#[tokio::test]
async fn missing_document_on_open_is_terminal() {
    time::pause();
    let store = ScriptedStore::default();
    let id = Uuid::new_v4();
    let session = Session::open(Documents::new(store.clone()), id, default_timing());

    let snapshot = session.settled().await;

    assert_eq!(snapshot.error, Some(SessionError::NotFound(id)));
    assert!(!snapshot.hydrated);
}

#[tokio::test]
async fn failed_load_is_retried_on_fallback_tick() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A").fail_fetches(1);
    let session = Session::open(Documents::new(store.clone()), id, default_timing());
    drain().await;

    let snapshot = session.snapshot();
    assert!(!snapshot.hydrated);
    assert!(snapshot.last_failure.is_some());

    advance(10_000).await;

    assert_eq!(store.fetch_calls(), 2);
    assert!(session.snapshot().hydrated);
    assert_eq!(session.content(), "A");
}

#[tokio::test]
async fn edits_after_failed_load_are_unsaved_until_persisted() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "server");
    let store = store.fail_fetches(1);
    let session = Session::open(Documents::new(store.clone()), id, default_timing());
    drain().await;

    session.update_content("draft typed after load failure");
    session.save();
    let snapshot = session.settled().await;

    assert!(!snapshot.hydrated);
    assert!(session.has_unsaved_changes());
    assert_eq!(session.before_leave(LeavePolicy::Confirm), LeaveDecision::ConfirmDiscard);
    assert!(store.saves().is_empty());

    // Load retry adopts the server fingerprint and the draft gets saved.
    advance(10_000).await;
    assert!(session.snapshot().hydrated);
    advance(2_000).await;
    assert_eq!(
        store.saves(),
        vec![SavePatch::new(id).with_content(content("draft typed after load failure"))]
    );
}

// ── Timers ──────────────────────────────────────────────────────────

#[tokio::test]
async fn fallback_tick_saves_dirty_content() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A").auto_complete();
    let session = open_hydrated(&store, id, autosave(60_000, 1_000)).await;

    session.update_content("AB");
    drain().await;
    advance(1_000).await;

    assert_eq!(store.saves(), vec![SavePatch::new(id).with_content(content("AB"))]);
    assert!(!session.is_dirty());

    advance(5_000).await;
    assert_eq!(store.saves().len(), 1);
}

#[tokio::test]
async fn clean_session_never_saves() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A").auto_complete();
    let session = open_hydrated(&store, id, autosave(100, 1_000)).await;

    session.save();
    advance(10_000).await;

    assert!(store.saves().is_empty());
    assert_eq!(session.status(), EditorStatus::Idle);
}

// ── Hydration ───────────────────────────────────────────────────────

#[tokio::test]
async fn reverting_an_edit_is_clean() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    session.update_content("AB");
    session.update_content("A");

    assert!(!session.is_dirty());
    advance(2_000).await;
    assert!(store.saves().is_empty());
}

#[tokio::test]
async fn edits_before_hydration_are_kept_and_saved() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "server").auto_complete();
    let session = Session::open(Documents::new(store.clone()), id, default_timing());

    session.update_content("draft");
    assert!(!session.is_dirty());
    drain().await;

    assert_eq!(session.content(), "draft");
    assert!(session.is_dirty());

    advance(2_000).await;
    assert_eq!(store.saves(), vec![SavePatch::new(id).with_content(content("draft"))]);
}

#[tokio::test]
async fn successful_save_updates_shared_cache() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A").auto_complete();
    let documents = Documents::new(store.clone());
    let session = Session::open(documents.clone(), id, default_timing());
    drain().await;

    session.update_content("AB");
    session.save();
    let snapshot = session.settled().await;

    assert_eq!(snapshot.status, EditorStatus::Idle);
    let cached = documents.cache().get(id).expect("cached after load");
    assert_eq!(cached.content.as_deref(), Some("AB"));
    assert_eq!(cached.fingerprint, Some(fingerprint("AB")));
}

// ── Leaving ─────────────────────────────────────────────────────────

#[tokio::test]
async fn before_leave_confirms_or_saves() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, default_timing()).await;

    assert_eq!(session.before_leave(LeavePolicy::Confirm), LeaveDecision::Proceed);

    session.update_content("AB");
    assert_eq!(session.before_leave(LeavePolicy::Confirm), LeaveDecision::ConfirmDiscard);
    assert!(store.saves().is_empty());

    assert_eq!(session.before_leave(LeavePolicy::SaveAndLeave), LeaveDecision::Proceed);
    drain().await;
    assert_eq!(store.saves(), vec![SavePatch::new(id).with_content(content("AB"))]);
}

#[tokio::test]
async fn closed_session_ignores_late_completion_and_timers() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let session = open_hydrated(&store, id, autosave(100, 1_000)).await;

    session.update_content("AB");
    session.save();
    drain().await;
    session.update_content("ABC");
    session.close();

    store.complete_next(Ok(()));
    advance(5_000).await;

    assert_eq!(store.saves().len(), 1);
    assert!(session.is_closed());
}

// ── Editor view ─────────────────────────────────────────────────────

#[tokio::test]
async fn open_replaces_previous_session_without_saving() {
    time::pause();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let store = ScriptedStore::with_document(first, "one").auto_complete();
    store.lock().documents.push(Document::new(second, None, Some("two".into())));
    let mut view = EditorView::new(Documents::new(store.clone()), default_timing());

    view.open(first).update_content("one!");
    drain().await;
    view.open(second);
    drain().await;

    let current = view.current().expect("session open");
    assert_eq!(current.id(), second);
    assert_eq!(current.content(), "two");
    assert!(!current.is_dirty());

    // The abandoned session's debounce never fires.
    advance(5_000).await;
    assert!(store.saves().is_empty());
}

#[tokio::test]
async fn guarded_switch_refuses_to_drop_unsaved_edits() {
    time::pause();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let store = ScriptedStore::with_document(first, "one").auto_complete();
    store.lock().documents.push(Document::new(second, None, Some("two".into())));
    let mut view = EditorView::new(Documents::new(store.clone()), default_timing());

    view.open(first);
    drain().await;
    view.open(first).update_content("one!");

    assert!(matches!(
        view.switch_to(second, LeavePolicy::Confirm),
        Err(LeaveDecision::ConfirmDiscard)
    ));
    let current = view.current().expect("session open");
    assert_eq!(current.id(), first);
    assert_eq!(current.content(), "one!");

    assert!(view.switch_to(second, LeavePolicy::SaveAndLeave).is_ok());
    drain().await;

    assert_eq!(store.saves(), vec![SavePatch::new(first).with_content(content("one!"))]);
    assert_eq!(view.current().map(|s| s.id()), Some(second));
}

#[tokio::test]
async fn reopening_same_document_keeps_session() {
    time::pause();
    let id = Uuid::new_v4();
    let store = ScriptedStore::with_document(id, "A");
    let mut view = EditorView::new(Documents::new(store.clone()), default_timing());

    view.open(id);
    drain().await;
    view.open(id).update_content("AB");
    let session = view.open(id);

    assert_eq!(session.content(), "AB");
    assert_eq!(store.fetch_calls(), 1);
    assert_eq!(view.before_leave(LeavePolicy::Confirm), LeaveDecision::ConfirmDiscard);

    view.close();
    assert!(view.current().is_none());
    assert_eq!(view.before_leave(LeavePolicy::Confirm), LeaveDecision::Proceed);
}
