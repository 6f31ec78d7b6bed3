use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

/// Upper bound on bound parameters per `IN (...)` statement.
const MAX_BATCH: usize = 500;

/// Disk-resident `row_index -> instructions` lookup. Every fetch opens its own
/// read-only connection; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct InstructionStore {
    path: PathBuf,
}

impl InstructionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn connection(&self) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Writes a fresh store, replacing any existing `instructions` table.
    /// Returns the number of rows written.
    pub fn create<P, I, S>(path: P, rows: I) -> Result<usize>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = (usize, S)>,
        S: AsRef<str>,
    {
        let path = path.as_ref();
        let mut conn = Connection::open(path)
            .with_context(|| format!("failed to create instructions store {}", path.display()))?;
        conn.execute_batch(
            r#"
            DROP TABLE IF EXISTS instructions;
            CREATE TABLE instructions (
                row_num INTEGER PRIMARY KEY,
                body TEXT
            );
            "#,
        )?;
        let tx = conn.transaction()?;
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare("INSERT INTO instructions (row_num, body) VALUES (?1, ?2)")?;
            for (row_index, body) in rows {
                stmt.execute(params![row_index as i64, body.as_ref()])?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Looks up exactly the requested rows. Keys missing from the store, and
    /// every key when the store itself is missing or unreadable, resolve to an
    /// empty string.
    pub fn fetch(&self, rows: &BTreeSet<usize>) -> FxHashMap<usize, String> {
        let mut resolved: FxHashMap<usize, String> =
            rows.iter().map(|row| (*row, String::new())).collect();
        if rows.is_empty() {
            return resolved;
        }
        if !self.is_available() {
            warn!(
                path = %self.path.display(),
                rows = rows.len(),
                "instructions store missing, serving empty instructions"
            );
            return resolved;
        }
        match self.query(rows) {
            Ok(found) => {
                debug!(requested = rows.len(), found = found.len(), "instructions fetched");
                for (row, body) in found {
                    if let Some(slot) = resolved.get_mut(&row) {
                        *slot = body;
                    }
                }
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "instructions lookup failed, serving empty instructions"
                );
            }
        }
        resolved
    }

    fn query(&self, rows: &BTreeSet<usize>) -> rusqlite::Result<Vec<(usize, String)>> {
        let conn = self.connection()?;
        let keys: Vec<i64> = rows.iter().map(|row| *row as i64).collect();
        let mut found = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(MAX_BATCH) {
            let placeholders = std::iter::repeat("?").take(chunk.len()).join(",");
            let mut stmt = conn.prepare(&format!(
                "SELECT row_num, body FROM instructions WHERE row_num IN ({placeholders})"
            ))?;
            let mut result = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = result.next()? {
                let row_num: i64 = row.get(0)?;
                let body: Option<String> = row.get(1)?;
                found.push((row_num as usize, body.unwrap_or_default()));
            }
        }
        Ok(found)
    }
}
