// Server configuration from the environment.
//
//   DOCSYNC_SERVER_ADDR  listen address (default 127.0.0.1:8080)
//   DOCSYNC_DB_PATH      SQLite file (default ~/.docsync/documents.db)

use std::path::PathBuf;

use anyhow::{Context, Result};

pub const ADDR_ENV: &str = "DOCSYNC_SERVER_ADDR";
pub const DB_PATH_ENV: &str = "DOCSYNC_DB_PATH";

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub db_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_values(std::env::var(ADDR_ENV).ok(), std::env::var(DB_PATH_ENV).ok())
    }

    fn from_values(addr: Option<String>, db_path: Option<String>) -> Result<Self> {
        let addr = addr.filter(|a| !a.trim().is_empty()).unwrap_or_else(|| DEFAULT_ADDR.into());
        let db_path = match db_path.filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => dirs::home_dir()
                .map(|home| home.join(".docsync").join("documents.db"))
                .with_context(|| format!("cannot resolve home directory; set {DB_PATH_ENV}"))?,
        };
        Ok(Self { addr, db_path })
    }
}
