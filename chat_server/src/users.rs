use crate::error::{classify_user_insert, StoreError};
use chat_model::User;
use rusqlite::{Connection, OptionalExtension};

/// Longest username accepted by [`create_user`].
pub const MAX_USERNAME_LEN: usize = 80;

/// Trim a requested username and check it is usable.
pub fn normalize_username(input: &str) -> Result<&str, StoreError> {
    let name = input.trim();
    if name.is_empty() || name.chars().count() > MAX_USERNAME_LEN {
        return Err(StoreError::InvalidUsername);
    }
    Ok(name)
}

/// Register a user. Usernames are unique ignoring ASCII case.
pub fn create_user(conn: &Connection, username: &str) -> Result<User, StoreError> {
    let username = normalize_username(username)?;
    conn.execute("INSERT INTO users (username) VALUES (?1)", [username])
        .map_err(|e| classify_user_insert(e, username))?;
    Ok(User {
        id: conn.last_insert_rowid(),
        username: username.to_string(),
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
    })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, StoreError> {
    let mut stmt = conn.prepare("SELECT id, username FROM users WHERE id = ?1")?;
    Ok(stmt.query_row([id], row_to_user).optional()?)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, StoreError> {
    let mut stmt = conn.prepare("SELECT id, username FROM users ORDER BY id")?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}
