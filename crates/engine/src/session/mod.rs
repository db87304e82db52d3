// Autosave editing session.
//
// One `Session` per open document. It owns the local title/content, decides
// when to save (idle debounce, periodic fallback tick, explicit save, title
// commit), and guarantees at most one save in flight for the document.
//
// All mutable state sits in `SessionCore` behind a std mutex that is never
// held across an `.await`. Caller methods, the scheduler loop and the spawned
// save/load completions all go through it, so ordering decisions are made in
// one place. Saves are fire-and-forget: callers never wait on the network.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use docsync_common::patch::SavePatch;
use docsync_common::types::{title_field, Document};
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AutosaveConfig;
use crate::documents::Documents;
use crate::store::{DocumentStore, StoreError};

pub mod flight;
pub mod state;
pub mod status;
pub mod timers;

use flight::{AfterFlight, FlightCoordinator, FlushOutcome};
use state::{Hydration, LocalState};
pub use status::EditorStatus;
use timers::SaveTimers;

// ── Public types ────────────────────────────────────────────────────

/// Terminal session errors. Transient failures are reported through
/// `SessionSnapshot::last_failure` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The document does not exist (deleted elsewhere or bad id).
    /// Automatic saves stop.
    #[error("document {0} not found")]
    NotFound(Uuid),
}

/// How `before_leave` treats unsaved work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeavePolicy {
    /// Ask the user before discarding.
    Confirm,
    /// Issue a final save and leave without waiting for it.
    SaveAndLeave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    Proceed,
    /// Unsaved work would be lost; the caller must confirm.
    ConfirmDiscard,
}

/// Point-in-time view of a session, published on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub document_id: Uuid,
    pub title: String,
    pub content: String,
    pub status: EditorStatus,
    pub dirty: bool,
    pub hydrated: bool,
    /// A committed title has not reached the server yet.
    pub pending_title: bool,
    pub error: Option<SessionError>,
    /// Message of the most recent transient failure, cleared on success.
    pub last_failure: Option<String>,
}

impl SessionSnapshot {
    /// Nothing loading and nothing in flight.
    pub fn is_settled(&self) -> bool {
        !matches!(self.status, EditorStatus::Loading | EditorStatus::Saving)
    }
}

// ── Core state ──────────────────────────────────────────────────────

struct SessionCore {
    state: LocalState,
    flight: FlightCoordinator,
    timers: SaveTimers,
    loading: bool,
    load_failed: bool,
    error: Option<SessionError>,
    last_failure: Option<String>,
    closed: bool,
}

impl SessionCore {
    fn new(id: Uuid, config: AutosaveConfig, now: Instant) -> Self {
        Self {
            state: LocalState::new(),
            flight: FlightCoordinator::new(id),
            timers: SaveTimers::new(config, now),
            loading: true,
            load_failed: false,
            error: None,
            last_failure: None,
            closed: false,
        }
    }

    fn status(&self) -> EditorStatus {
        EditorStatus::derive(self.loading, self.flight.is_in_flight(), self.state.is_dirty())
    }

    fn has_unsaved_changes(&self) -> bool {
        self.state.is_dirty()
            || self.state.has_unhydrated_edits()
            || self.flight.has_pending_title()
    }

    fn snapshot(&self, id: Uuid) -> SessionSnapshot {
        SessionSnapshot {
            document_id: id,
            title: self.state.title().to_string(),
            content: self.state.content().to_string(),
            status: self.status(),
            dirty: self.state.is_dirty(),
            hydrated: self.state.is_hydrated(),
            pending_title: self.flight.has_pending_title(),
            error: self.error.clone(),
            last_failure: self.last_failure.clone(),
        }
    }
}

struct Shared<S: DocumentStore> {
    id: Uuid,
    documents: Documents<S>,
    core: Mutex<SessionCore>,
    /// Wakes the scheduler loop when deadlines change.
    wake: Notify,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    shutdown_tx: watch::Sender<bool>,
}

impl<S: DocumentStore> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, core: &SessionCore) {
        let next = core.snapshot(self.id);
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Attempt a save. The caller holds the lock, so the in-flight marker is
    /// set before any other trigger can observe the coordinator.
    fn flush_locked(self: &Arc<Self>, core: &mut SessionCore, trigger: &'static str) {
        if core.closed || core.error.is_some() {
            return;
        }
        match core.flight.request(&core.state) {
            FlushOutcome::Dispatch(patch) => {
                debug!(
                    doc_id = %self.id,
                    trigger,
                    title = patch.title.is_present(),
                    content = patch.content.is_present(),
                    "dispatching save"
                );
                self.dispatch(patch);
            }
            FlushOutcome::Coalesced => {
                debug!(doc_id = %self.id, trigger, "save in flight, re-save requested");
            }
            FlushOutcome::NoWork => {
                debug!(doc_id = %self.id, trigger, "nothing to save");
            }
        }
    }

    fn dispatch(self: &Arc<Self>, patch: SavePatch) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let result = shared.documents.save(&patch).await;
            shared.on_saved(result);
        });
    }

    fn on_saved(self: &Arc<Self>, result: Result<(), StoreError>) {
        let mut guard = self.lock();
        let core = &mut *guard;
        if core.closed {
            debug!(doc_id = %self.id, "save completed after close, ignored");
            return;
        }

        match &result {
            Ok(()) => {
                debug!(doc_id = %self.id, "save succeeded");
                core.last_failure = None;
            }
            Err(e) if e.is_not_found() => {
                warn!(doc_id = %self.id, "document no longer exists, autosave stopped");
                core.error = Some(SessionError::NotFound(self.id));
                core.timers.cancel_debounce();
            }
            Err(e) => {
                warn!(doc_id = %self.id, error = %e, "save failed");
                core.last_failure = Some(e.to_string());
            }
        }

        match core.flight.settle(&mut core.state, &result) {
            AfterFlight::FlushNow => self.flush_locked(core, "replay"),
            // Resending the same content would fail the same way. The next
            // edit or the fallback tick retries.
            AfterFlight::ArmDebounce if result.as_ref().is_err_and(|e| !e.is_retryable()) => {
                debug!(doc_id = %self.id, "save rejected, waiting for an edit or fallback tick");
            }
            AfterFlight::ArmDebounce => {
                core.timers.arm_debounce_at(Instant::now());
                self.wake.notify_one();
            }
            AfterFlight::Idle => {}
        }
        self.publish(core);
    }

    fn spawn_load(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let result = shared.documents.get(shared.id).await;
            shared.on_loaded(result);
        });
    }

    fn on_loaded(&self, result: Result<Document, StoreError>) {
        let mut guard = self.lock();
        let core = &mut *guard;
        if core.closed {
            return;
        }
        core.loading = false;

        match result {
            Ok(document) => {
                core.load_failed = false;
                core.last_failure = None;
                match core.state.hydrate(&document) {
                    Hydration::Applied => info!(doc_id = %self.id, "session hydrated"),
                    Hydration::KeptLocalEdits => {
                        info!(doc_id = %self.id, "session hydrated, local edits kept");
                        if core.state.is_dirty() {
                            core.timers.arm_debounce_at(Instant::now());
                            self.wake.notify_one();
                        }
                    }
                    Hydration::Ignored => {}
                }
            }
            Err(e) if e.is_not_found() => {
                warn!(doc_id = %self.id, "document not found");
                core.error = Some(SessionError::NotFound(self.id));
            }
            Err(e) => {
                warn!(doc_id = %self.id, error = %e, "load failed, will retry on fallback tick");
                core.load_failed = true;
                core.last_failure = Some(e.to_string());
            }
        }
        self.publish(core);
    }

    fn on_debounce(self: &Arc<Self>) {
        let mut guard = self.lock();
        let core = &mut *guard;
        if !core.timers.take_due_debounce(Instant::now()) {
            return;
        }
        self.flush_locked(core, "debounce");
        self.publish(core);
    }

    fn on_fallback_tick(self: &Arc<Self>) {
        let now = Instant::now();
        let mut guard = self.lock();
        let core = &mut *guard;
        if !core.timers.fallback_due_at(now) {
            return;
        }
        core.timers.restart_fallback_at(now);

        if core.closed || core.error.is_some() {
            return;
        }
        if core.load_failed && !core.loading {
            debug!(doc_id = %self.id, "retrying load");
            core.loading = true;
            self.spawn_load();
        } else if core.state.is_hydrated()
            && !core.flight.is_in_flight()
            && core.has_unsaved_changes()
        {
            self.flush_locked(core, "fallback");
        }
        self.publish(core);
    }
}

// ── Scheduler loop ──────────────────────────────────────────────────

async fn run_scheduler<S: DocumentStore>(
    shared: Arc<Shared<S>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let (debounce_at, fallback_at) = {
            let core = shared.lock();
            (core.timers.debounce_deadline(), core.timers.fallback_deadline())
        };

        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!(doc_id = %shared.id, "scheduler shutting down");
                break;
            }
            // Deadlines moved; recompute.
            _ = shared.wake.notified() => {}
            _ = sleep_until_some(debounce_at) => shared.on_debounce(),
            _ = time::sleep_until(fallback_at) => shared.on_fallback_tick(),
        }
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ── Session handle ──────────────────────────────────────────────────

/// Handle to an open editing session. Dropping it closes the session.
pub struct Session<S: DocumentStore> {
    shared: Arc<Shared<S>>,
    scheduler: JoinHandle<()>,
}

impl<S: DocumentStore> Session<S> {
    /// Open a session for `id`: starts loading the server copy and the
    /// scheduler loop. Must be called within a tokio runtime.
    pub fn open(documents: Documents<S>, id: Uuid, config: AutosaveConfig) -> Self {
        let core = SessionCore::new(id, config, Instant::now());
        let (snapshot_tx, _) = watch::channel(core.snapshot(id));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            id,
            documents,
            core: Mutex::new(core),
            wake: Notify::new(),
            snapshot_tx,
            shutdown_tx,
        });

        shared.spawn_load();
        let scheduler = tokio::spawn(run_scheduler(Arc::clone(&shared), shutdown_rx));
        info!(doc_id = %id, "session opened");

        Self { shared, scheduler }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn documents(&self) -> &Documents<S> {
        &self.shared.documents
    }

    /// Receive a snapshot on every observable change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().snapshot(self.shared.id)
    }

    pub fn status(&self) -> EditorStatus {
        self.shared.lock().status()
    }

    /// Synchronous: usable from a navigation guard.
    pub fn is_dirty(&self) -> bool {
        self.shared.lock().state.is_dirty()
    }

    /// Dirty content, content typed before the document loaded, or a
    /// committed title that has not been persisted.
    pub fn has_unsaved_changes(&self) -> bool {
        self.shared.lock().has_unsaved_changes()
    }

    pub fn title(&self) -> String {
        self.shared.lock().state.title().to_string()
    }

    pub fn content(&self) -> String {
        self.shared.lock().state.content().to_string()
    }

    /// Edit the title locally. Nothing is saved until `save_title`.
    pub fn set_title(&self, title: &str) {
        let mut core = self.shared.lock();
        if core.closed {
            return;
        }
        core.state.set_title(title);
        self.shared.publish(&core);
    }

    /// Replace the local content and restart the idle debounce.
    pub fn update_content(&self, content: impl Into<String>) {
        let now = Instant::now();
        let mut core = self.shared.lock();
        if core.closed {
            return;
        }
        core.state.update_content(content.into());
        core.timers.arm_debounce_at(now);
        self.shared.wake.notify_one();
        self.shared.publish(&core);
    }

    /// Explicit save (blur, shortcut, menu): skips the debounce.
    pub fn save(&self) {
        let now = Instant::now();
        let mut guard = self.shared.lock();
        let core = &mut *guard;
        if core.closed {
            return;
        }
        core.timers.cancel_debounce();
        core.timers.restart_fallback_at(now);
        self.shared.flush_locked(core, "manual");
        self.shared.wake.notify_one();
        self.shared.publish(core);
    }

    /// Commit a title and save it right away, independent of content.
    /// Surrounding whitespace is dropped; a blank title clears it.
    pub fn save_title(&self, title: &str) {
        let mut guard = self.shared.lock();
        let core = &mut *guard;
        if core.closed {
            return;
        }
        core.state.set_title(title);
        core.flight.queue_title(title_field(title));
        self.shared.flush_locked(core, "title");
        self.shared.publish(core);
    }

    /// Navigation guard.
    pub fn before_leave(&self, policy: LeavePolicy) -> LeaveDecision {
        if !self.has_unsaved_changes() {
            return LeaveDecision::Proceed;
        }
        match policy {
            LeavePolicy::Confirm => LeaveDecision::ConfirmDiscard,
            LeavePolicy::SaveAndLeave => {
                self.save();
                LeaveDecision::Proceed
            }
        }
    }

    /// Wait until nothing is loading or in flight.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.is_settled() {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }

    /// Stop timers and ignore any completion that arrives later.
    pub fn close(&self) {
        {
            let mut core = self.shared.lock();
            if core.closed {
                return;
            }
            core.closed = true;
            core.timers.cancel_debounce();
        }
        let _ = self.shared.shutdown_tx.send(true);
        self.scheduler.abort();
        info!(doc_id = %self.shared.id, "session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl<S: DocumentStore> Drop for Session<S> {
    fn drop(&mut self) {
        self.close();
    }
}
