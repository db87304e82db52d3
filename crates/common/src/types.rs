// Core document types shared across all docsync crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::fingerprint::{fingerprint_of, Fingerprint};
use crate::patch::{PatchField, SavePatch};

/// The authoritative, server-owned copy of a document.
///
/// `fingerprint` always equals `fingerprint_of(content)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: Option<String>,
    pub fingerprint: Option<Fingerprint>,
}

impl Document {
    /// A freshly created document: no title, no content.
    pub fn empty(id: Uuid) -> Self {
        Self { id, title: None, content: None, fingerprint: None }
    }

    /// Build a document from stored fields, normalizing empty content to
    /// `None` and deriving the fingerprint.
    pub fn new(id: Uuid, title: Option<String>, content: Option<String>) -> Self {
        let content = content.filter(|c| !c.is_empty());
        let fingerprint = fingerprint_of(content.as_deref());
        Self { id, title, content, fingerprint }
    }

    /// Apply a partial update with the persistence service's semantics:
    /// absent fields are left alone, `null` clears, empty content is stored
    /// as `None`, and the fingerprint is recomputed whenever content changes.
    pub fn apply_patch(&mut self, patch: &SavePatch) -> Result<(), PatchError> {
        if patch.id != self.id {
            return Err(PatchError::IdMismatch { expected: self.id, found: patch.id });
        }

        if let Some(title) = patch.title.as_update() {
            self.title = title.cloned();
        }

        if let Some(content) = patch.content.as_update() {
            self.content = content.filter(|c| !c.is_empty()).cloned();
            self.fingerprint = fingerprint_of(self.content.as_deref());
        }

        Ok(())
    }

    /// Whether the stored fingerprint matches the stored content.
    pub fn fingerprint_is_consistent(&self) -> bool {
        self.fingerprint == fingerprint_of(self.content.as_deref())
    }

    /// Title for listings; untitled documents get a placeholder.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => "Untitled",
        }
    }
}

/// Response of the create operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedDocument {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("patch targets document {found}, expected {expected}")]
    IdMismatch { expected: Uuid, found: Uuid },
}

/// Normalize user-entered title text into a patch field: trimmed, with an
/// empty title clearing the stored one.
pub fn title_field(raw: &str) -> PatchField<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        PatchField::Clear
    } else {
        PatchField::Set(trimmed.to_string())
    }
}
