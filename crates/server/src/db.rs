// SQLite-backed document storage.
//
// One table, `documents`, plus `schema_migrations` for versioned schema
// upgrades. Content fingerprints are computed here on every write so the
// stored fingerprint always matches the stored content.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use docsync_common::fingerprint::Fingerprint;
use docsync_common::patch::SavePatch;
use docsync_common::types::Document;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE documents (
    id          TEXT PRIMARY KEY,
    title       TEXT NULL,
    content     TEXT NULL,
    fingerprint TEXT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX documents_updated_idx
    ON documents (updated_at);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, MIGRATION_V1_SQL)];

const SELECT_COLUMNS: &str = "SELECT id, title, content, fingerprint FROM documents";

#[derive(Debug)]
pub struct DocumentDb {
    conn: Mutex<Connection>,
}

impl DocumentDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database parent directory `{}`", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at `{}`", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .context("failed to configure sqlite pragmas")?;

        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        ensure_migration_table(&conn)?;
        apply_pending_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn schema_version(&self) -> Result<i64> {
        current_schema_version(&self.conn())
    }

    /// All documents, most recently updated first.
    pub fn list(&self) -> Result<Vec<Document>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY updated_at DESC, rowid DESC"))
            .context("failed to prepare document listing")?;
        let rows = stmt.query_map([], document_from_row).context("failed to list documents")?;
        let mut documents = Vec::new();
        for row in rows {
            documents.push(row.context("failed to decode document row")??);
        }
        Ok(documents)
    }

    /// Insert an empty document and return its id.
    pub fn create(&self) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = timestamp();
        self.conn()
            .execute(
                "INSERT INTO documents (id, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![id.to_string(), now],
            )
            .context("failed to insert document")?;
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn();
        fetch(&conn, id)
    }

    /// Apply a partial update. Returns the stored document, or `None` if the
    /// id is unknown.
    pub fn update(&self, patch: &SavePatch) -> Result<Option<Document>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to start update transaction")?;

        let Some(mut document) = fetch(&tx, patch.id)? else {
            return Ok(None);
        };
        document.apply_patch(patch)?;

        tx.execute(
            "UPDATE documents SET title = ?2, content = ?3, fingerprint = ?4, updated_at = ?5 \
             WHERE id = ?1",
            params![
                document.id.to_string(),
                document.title,
                document.content,
                document.fingerprint.as_ref().map(|f| f.as_str().to_owned()),
                timestamp(),
            ],
        )
        .context("failed to update document")?;
        tx.commit().context("failed to commit document update")?;

        Ok(Some(document))
    }

    /// Returns false if the id is unknown.
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])
            .context("failed to delete document")?;
        Ok(removed > 0)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn fetch(conn: &Connection, id: Uuid) -> Result<Option<Document>> {
    let row = conn
        .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id.to_string()], |row| {
            document_from_row(row)
        })
        .optional()
        .context("failed to read document")?;
    row.transpose()
}

/// Decode a row. The outer result is sqlite's, the inner one covers ids
/// that are not valid UUIDs.
fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Document>> {
    let id: String = row.get(0)?;
    let title: Option<String> = row.get(1)?;
    let content: Option<String> = row.get(2)?;
    let fingerprint: Option<String> = row.get(3)?;

    Ok(Uuid::parse_str(&id).with_context(|| format!("invalid document id `{id}`")).map(|id| {
        Document { id, title, content, fingerprint: fingerprint.map(Fingerprint::from_hex) }
    }))
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn ensure_migration_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );
        ",
    )
    .context("failed to ensure schema_migrations table exists")
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
        .context("failed to read current schema version")
}

fn apply_pending_migrations(conn: &mut Connection) -> Result<()> {
    let mut current_version = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current_version {
            continue;
        }

        let tx = conn.transaction().context("failed to start migration transaction")?;
        tx.execute_batch(sql).with_context(|| format!("failed to apply migration v{version}"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            params![version],
        )
        .with_context(|| format!("failed to record migration v{version}"))?;
        tx.commit().with_context(|| format!("failed to commit migration v{version}"))?;
        current_version = *version;
    }

    Ok(())
}
