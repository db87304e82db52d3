// docsync-engine: autosave synchronization engine for document editing sessions.

pub mod cache;
pub mod config;
pub mod documents;
pub mod session;
pub mod store;
pub mod view;
