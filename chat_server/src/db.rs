use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::Path;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Open a single SQLite connection and run migrations.
pub fn init_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(PRAGMAS)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Build a connection pool for the database at `path`, or an in-memory
/// database when `path` is `None`, and run migrations.
///
/// Every connection to `:memory:` is its own database, so the in-memory pool
/// holds exactly one connection.
pub fn open_pool(path: Option<&Path>) -> Result<DbPool> {
    let (manager, max_size) = match path {
        Some(p) => {
            if let Some(dir) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating database directory {}", dir.display()))?;
            }
            (SqliteConnectionManager::file(p), 8)
        }
        None => (SqliteConnectionManager::memory(), 1),
    };
    let manager = manager.with_init(|c| c.execute_batch(PRAGMAS));
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .context("opening database pool")?;
    pool.get()?
        .execute_batch(SCHEMA)
        .context("running migrations")?;
    Ok(pool)
}

const PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  username TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS chat_messages (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  content TEXT NOT NULL CONSTRAINT content_not_empty CHECK (length(content) > 0),
  timestamp TEXT,
  user_id INTEGER NOT NULL REFERENCES users(id),
  room_id TEXT NOT NULL DEFAULT 'general'
    CONSTRAINT room_id_length CHECK (length(room_id) BETWEEN 1 AND 100)
);

CREATE INDEX IF NOT EXISTS chat_messages_user ON chat_messages(user_id, timestamp);
CREATE INDEX IF NOT EXISTS chat_messages_room ON chat_messages(room_id, timestamp);
"#;
