// docsync-common: shared document types and change detection for the docsync workspace

pub mod fingerprint;
pub mod patch;
pub mod types;
