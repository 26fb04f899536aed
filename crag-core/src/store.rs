use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

/// One indexed passage of complaint text with its source metadata.
///
/// The answer pipeline reads `product`, `complaint_id`, and `text`;
/// `issue` and `received` come along from the corpus export and are kept
/// for external consumers of the artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplaintChunk {
    pub product: String,
    pub complaint_id: String,
    pub text: String,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub received: Option<DateTime<Utc>>,
}

/// Errors from the metadata store.
#[derive(Debug)]
pub enum StoreError {
    /// A storage failure (I/O, SQL, corrupt row).
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// SQLite-backed chunk metadata store.
///
/// Rows are keyed by `position`, assigned densely from zero in insertion
/// order. The index builder appends metadata here in the same order it
/// appends vectors to the index, so `get(i)` returns the chunk whose vector
/// sits at position `i`. Read-only at query time.
///
/// Wraps a `Connection` in a `Mutex` so it is `Send + Sync`.
pub struct MetadataStore {
    conn: Mutex<Connection>,
}

impl MetadataStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Storage(format!("failed to open database '{}': {e}", path.display()))
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    ///
    /// This is a test helper and should not be used in production code.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Storage(format!("failed to open in-memory database: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run schema migrations idempotently.
    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS chunks (
                position INTEGER PRIMARY KEY,
                product TEXT NOT NULL,
                complaint_id TEXT NOT NULL,
                text TEXT NOT NULL,
                issue TEXT,
                received TEXT
            );
            ",
        )
        .map_err(|e| StoreError::Storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Append a chunk, returning its assigned position.
    ///
    /// Used by index builders and tests; the serving path never writes.
    pub fn append(&self, chunk: &ComplaintChunk) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let position: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM chunks",
                [],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Storage(format!("failed to allocate position: {e}")))?;

        conn.execute(
            "INSERT INTO chunks (position, product, complaint_id, text, issue, received)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                position,
                chunk.product,
                chunk.complaint_id,
                chunk.text,
                chunk.issue,
                chunk.received.map(|d| d.to_rfc3339()),
            ],
        )
        .map_err(|e| StoreError::Storage(format!("failed to append chunk: {e}")))?;

        Ok(position as usize)
    }

    /// Fetch the chunk at `position`, or `None` when the position is past
    /// the end of the store.
    pub fn get(&self, position: usize) -> Result<Option<ComplaintChunk>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT product, complaint_id, text, issue, received
             FROM chunks WHERE position = ?1",
            params![position as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        );

        match result {
            Ok((product, complaint_id, text, issue, received)) => {
                let received = received
                    .map(|s| {
                        DateTime::parse_from_rfc3339(&s)
                            .map(|d| d.with_timezone(&Utc))
                            .map_err(|e| {
                                StoreError::Storage(format!("invalid received timestamp: {e}"))
                            })
                    })
                    .transpose()?;
                Ok(Some(ComplaintChunk {
                    product,
                    complaint_id,
                    text,
                    issue,
                    received,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Storage(format!("failed to read chunk: {e}"))),
        }
    }

    /// Number of stored chunks.
    pub fn len(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .map_err(|e| StoreError::Storage(format!("failed to count chunks: {e}")))?;
        Ok(count as usize)
    }
}
