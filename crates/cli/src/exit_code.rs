// Consistent exit codes for the docsync CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   3  = document not found
//   4  = unsaved changes left behind
//   10 = server not reachable

use std::process;

use docsync_engine::session::SessionError;
use docsync_engine::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotFound = 3,
    Unsaved = 4,
    ServerDown = 10,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(store_err) = cause.downcast_ref::<StoreError>() {
                return Self::from_store_error(store_err);
            }
            if let Some(SessionError::NotFound(_)) = cause.downcast_ref::<SessionError>() {
                return Self::NotFound;
            }
            if cause.downcast_ref::<UnsavedChanges>().is_some() {
                return Self::Unsaved;
            }
        }
        Self::Error
    }

    pub fn from_store_error(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::Transport { .. } => Self::ServerDown,
            StoreError::Server { status: 400, .. } => Self::Usage,
            StoreError::Server { .. } | StoreError::Decode { .. } => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// The editor ended while edits had not reached the server.
#[derive(Debug)]
pub struct UnsavedChanges;

impl std::fmt::Display for UnsavedChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "editor closed with unsaved changes")
    }
}

impl std::error::Error for UnsavedChanges {}
