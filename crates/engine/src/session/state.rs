// Local editing state and dirty detection.
//
// Holds the title/content the user sees and the fingerprint of the last copy
// known to be persisted. Dirty means the local content fingerprint differs
// from that persisted fingerprint.

use docsync_common::fingerprint::{fingerprint_of, Fingerprint};
use docsync_common::patch::PatchField;
use docsync_common::types::Document;

/// Result of offering a server copy to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// First server copy: local title and content replaced.
    Applied,
    /// First server copy, but the user already edited; local text kept and
    /// only the server fingerprint adopted.
    KeptLocalEdits,
    /// Already hydrated; later server copies never overwrite local edits.
    Ignored,
}

#[derive(Debug, Default)]
pub struct LocalState {
    title: String,
    content: String,
    server_fingerprint: Option<Fingerprint>,
    hydrated: bool,
    title_edited: bool,
    content_edited: bool,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the server copy. Only the first call per session has an effect.
    pub fn hydrate(&mut self, document: &Document) -> Hydration {
        if self.hydrated {
            return Hydration::Ignored;
        }
        self.hydrated = true;
        self.server_fingerprint = document.fingerprint.clone();

        if !self.title_edited {
            self.title = document.title.clone().unwrap_or_default();
        }
        if self.content_edited {
            return Hydration::KeptLocalEdits;
        }
        self.content = document.content.clone().unwrap_or_default();
        if self.title_edited {
            Hydration::KeptLocalEdits
        } else {
            Hydration::Applied
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.title_edited = true;
    }

    pub fn update_content(&mut self, content: String) {
        self.content = content;
        self.content_edited = true;
    }

    /// Local content differs from the last persisted copy. Never dirty before
    /// the first server copy arrived.
    pub fn is_dirty(&self) -> bool {
        self.hydrated && self.local_fingerprint() != self.server_fingerprint
    }

    pub fn local_fingerprint(&self) -> Option<Fingerprint> {
        fingerprint_of(Some(&self.content))
    }

    /// Content as it goes into a save patch: empty content clears.
    pub fn content_patch(&self) -> PatchField<String> {
        if self.content.is_empty() {
            PatchField::Clear
        } else {
            PatchField::Set(self.content.clone())
        }
    }

    /// Record that `sent` content was persisted. The fingerprint follows what
    /// was sent, not whatever the local content has become since.
    pub fn mark_persisted(&mut self, sent: &PatchField<String>) {
        if let Some(content) = sent.as_update() {
            self.server_fingerprint = fingerprint_of(content.map(String::as_str));
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn server_fingerprint(&self) -> Option<&Fingerprint> {
        self.server_fingerprint.as_ref()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Content typed before the first server copy arrived. Not dirty yet,
    /// but lost if the session ends now.
    pub fn has_unhydrated_edits(&self) -> bool {
        !self.hydrated && self.content_edited
    }
}
