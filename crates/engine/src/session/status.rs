// Single editor status derived from independent session flags.

use serde::Serialize;

/// What the editor should show. Exactly one value at a time, so impossible
/// flag combinations never reach the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorStatus {
    /// Initial fetch of the server copy is in flight.
    Loading,
    /// Local content matches the last known server copy.
    Idle,
    /// Local content differs from the last known server copy.
    Dirty,
    /// A save request is in flight.
    Saving,
}

impl EditorStatus {
    /// Precedence: loading > saving > dirty > idle.
    pub fn derive(loading: bool, saving: bool, dirty: bool) -> Self {
        if loading {
            Self::Loading
        } else if saving {
            Self::Saving
        } else if dirty {
            Self::Dirty
        } else {
            Self::Idle
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Idle => "idle",
            Self::Dirty => "dirty",
            Self::Saving => "saving",
        }
    }

    /// Short human label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Loading => "Loading...",
            Self::Idle => "Saved",
            Self::Dirty => "Unsaved",
            Self::Saving => "Saving...",
        }
    }
}
