use chat_model::TimestampError;
use rusqlite::{ffi, ErrorCode};
use thiserror::Error;

/// Failures surfaced by the chat store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("empty_content")]
    EmptyContent,
    #[error("unknown_user: {0}")]
    UnknownUser(i64),
    #[error("invalid_room")]
    InvalidRoom,
    #[error("invalid_timestamp: {0}")]
    InvalidTimestamp(#[from] TimestampError),
    #[error("invalid_username")]
    InvalidUsername,
    #[error("duplicate_user: {0}")]
    DuplicateUser(String),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl StoreError {
    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::EmptyContent => "empty_content",
            StoreError::UnknownUser(_) => "unknown_user",
            StoreError::InvalidRoom => "invalid_room",
            StoreError::InvalidTimestamp(_) => "invalid_timestamp",
            StoreError::InvalidUsername => "invalid_username",
            StoreError::DuplicateUser(_) => "duplicate_user",
            StoreError::Db(_) | StoreError::Pool(_) => "internal",
        }
    }
}

/// Map a constraint violation raised while inserting a message to the
/// matching typed error.
pub(crate) fn classify_message_insert(e: rusqlite::Error, user_id: i64) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, msg) = &e {
        if err.code == ErrorCode::ConstraintViolation {
            let msg = msg.as_deref().unwrap_or_default();
            match err.extended_code {
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StoreError::UnknownUser(user_id),
                ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL
                    if msg.contains("content") =>
                {
                    return StoreError::EmptyContent
                }
                ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL
                    if msg.contains("room_id") =>
                {
                    return StoreError::InvalidRoom
                }
                _ => {}
            }
        }
    }
    StoreError::Db(e)
}

/// Map a unique violation on `users.username` to [`StoreError::DuplicateUser`].
pub(crate) fn classify_user_insert(e: rusqlite::Error, username: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
            return StoreError::DuplicateUser(username.to_string());
        }
    }
    StoreError::Db(e)
}
