// Flight coordination: at most one outstanding save per document.
//
// States:
//   idle       --request-->  in flight   (patch had work)
//   idle       --request-->  idle        (no work, nothing sent)
//   in flight  --request-->  in flight   (coalesced: resave flag set)
//   in flight  --settle--->  idle        (then replay / debounce / nothing)
//
// Requests that arrive while a save is outstanding are never queued as
// separate saves; a single flag plus the latest pending title is enough
// because only the latest content matters.

use docsync_common::patch::{PatchField, SavePatch};
use uuid::Uuid;

use super::state::LocalState;
use crate::store::StoreError;

/// Outcome of a save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Send this patch now; the coordinator is in flight until `settle`.
    Dispatch(SavePatch),
    /// A save is outstanding; the request was folded into one replay.
    Coalesced,
    /// Neither content nor title has pending work.
    NoWork,
}

/// What the scheduler must do once a flight settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFlight {
    /// Explicit re-save requested or a title queued mid-flight: flush now.
    FlushNow,
    /// Content changed mid-flight without an explicit request: debounce.
    ArmDebounce,
    /// Nothing left to do.
    Idle,
}

#[derive(Debug)]
pub struct FlightCoordinator {
    doc_id: Uuid,
    in_flight: Option<SavePatch>,
    resave_requested: bool,
    pending_title: PatchField<String>,
}

impl FlightCoordinator {
    pub fn new(doc_id: Uuid) -> Self {
        Self {
            doc_id,
            in_flight: None,
            resave_requested: false,
            pending_title: PatchField::Unchanged,
        }
    }

    /// Queue a title for the next flush. A newer title replaces an older one.
    pub fn queue_title(&mut self, title: PatchField<String>) {
        self.pending_title = title;
    }

    /// Attempt a save against the current local state.
    pub fn request(&mut self, state: &LocalState) -> FlushOutcome {
        if self.in_flight.is_some() {
            self.resave_requested = true;
            return FlushOutcome::Coalesced;
        }

        let mut patch = SavePatch::new(self.doc_id);
        if state.is_dirty() {
            patch.content = state.content_patch();
        }
        if self.pending_title.is_present() {
            patch.title = self.pending_title.take();
        }

        if !patch.has_work() {
            return FlushOutcome::NoWork;
        }

        self.resave_requested = false;
        self.in_flight = Some(patch.clone());
        FlushOutcome::Dispatch(patch)
    }

    /// Settle the outstanding save and decide the follow-up.
    pub fn settle(
        &mut self,
        state: &mut LocalState,
        result: &Result<(), StoreError>,
    ) -> AfterFlight {
        let Some(sent) = self.in_flight.take() else {
            return AfterFlight::Idle;
        };

        match result {
            Ok(()) => state.mark_persisted(&sent.content),
            Err(error) if error.is_not_found() => {
                // Terminal: nothing we queued can ever land.
                self.resave_requested = false;
                self.pending_title = PatchField::Unchanged;
                return AfterFlight::Idle;
            }
            Err(_) => {}
        }

        let replay = self.resave_requested || self.pending_title.is_present();

        if result.is_err() && !self.pending_title.is_present() {
            // Keep a title lost to the failure for the next attempt, unless a
            // newer one already superseded it.
            self.pending_title = sent.title;
        }

        if replay {
            self.resave_requested = false;
            AfterFlight::FlushNow
        } else if state.is_dirty() {
            AfterFlight::ArmDebounce
        } else {
            AfterFlight::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&SavePatch> {
        self.in_flight.as_ref()
    }

    pub fn resave_requested(&self) -> bool {
        self.resave_requested
    }

    pub fn has_pending_title(&self) -> bool {
        self.pending_title.is_present()
    }
}
