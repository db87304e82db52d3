// Editor view: the single open session of a window.
//
// Opening another document tears the current session down first, so local
// state never leaks across document ids and hydration runs again.

use tracing::debug;
use uuid::Uuid;

use crate::config::AutosaveConfig;
use crate::documents::Documents;
use crate::session::{LeaveDecision, LeavePolicy, Session};
use crate::store::DocumentStore;

pub struct EditorView<S: DocumentStore> {
    documents: Documents<S>,
    config: AutosaveConfig,
    session: Option<Session<S>>,
}

impl<S: DocumentStore> EditorView<S> {
    pub fn new(documents: Documents<S>, config: AutosaveConfig) -> Self {
        Self { documents, config, session: None }
    }

    /// Show `id`. Reuses the current session when it already edits `id`.
    ///
    /// Switching closes the previous session without saving it; unsaved
    /// edits there are dropped. Use `switch_to` to guard the switch.
    pub fn open(&mut self, id: Uuid) -> &Session<S> {
        let reuse = self.session.as_ref().is_some_and(|s| s.id() == id && !s.is_closed());
        if !reuse {
            if let Some(previous) = self.session.take() {
                debug!(from = %previous.id(), to = %id, "switching document");
                previous.close();
            }
        }
        self.session.get_or_insert_with(|| Session::open(self.documents.clone(), id, self.config))
    }

    /// Show `id` unless the current session holds unsaved work that
    /// `policy` will not let go. With `SaveAndLeave` the final save is
    /// dispatched before the previous session closes.
    pub fn switch_to(
        &mut self,
        id: Uuid,
        policy: LeavePolicy,
    ) -> Result<&Session<S>, LeaveDecision> {
        let switching = self.session.as_ref().is_some_and(|s| s.id() != id);
        if switching {
            if let LeaveDecision::ConfirmDiscard = self.before_leave(policy) {
                return Err(LeaveDecision::ConfirmDiscard);
            }
        }
        Ok(self.open(id))
    }

    pub fn current(&self) -> Option<&Session<S>> {
        self.session.as_ref()
    }

    /// Guard for leaving the view entirely. Without a session there is
    /// nothing to lose.
    pub fn before_leave(&self, policy: LeavePolicy) -> LeaveDecision {
        self.session.as_ref().map_or(LeaveDecision::Proceed, |s| s.before_leave(policy))
    }

    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    pub fn documents(&self) -> &Documents<S> {
        &self.documents
    }
}
