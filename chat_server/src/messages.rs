use crate::error::{classify_message_insert, StoreError};
use chat_model::{timefmt, ChatMessage, NewChatMessage, ResolvedMessage, MAX_ROOM_LEN};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use time::OffsetDateTime;
use tracing::debug;

const COLUMNS: &str = "id, content, timestamp, user_id, room_id";

/// Reject input the schema would refuse, with a typed error.
pub fn validate(msg: &ResolvedMessage) -> Result<(), StoreError> {
    if msg.content.is_empty() {
        return Err(StoreError::EmptyContent);
    }
    let room_len = msg.room_id.chars().count();
    if room_len == 0 || room_len > MAX_ROOM_LEN {
        return Err(StoreError::InvalidRoom);
    }
    Ok(())
}

/// Insert a message, filling `room_id` and `timestamp` defaults.
pub fn create_message(conn: &Connection, new: NewChatMessage) -> Result<ChatMessage, StoreError> {
    let msg = new.resolve(OffsetDateTime::now_utc())?;
    validate(&msg)?;
    let timestamp = timefmt::to_storage(msg.timestamp)?;
    conn.execute(
        "INSERT INTO chat_messages (content, timestamp, user_id, room_id) VALUES (?1, ?2, ?3, ?4)",
        params![msg.content, timestamp, msg.user_id, msg.room_id],
    )
    .map_err(|e| classify_message_insert(e, msg.user_id))?;
    let id = conn.last_insert_rowid();
    debug!(id, user_id = msg.user_id, room = %msg.room_id, "message stored");
    Ok(msg.into_message(id))
}

fn row_to_msg(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let timestamp = row
        .get::<_, Option<String>>(2)?
        .map(|s| timefmt::from_storage(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(ChatMessage {
        id: row.get(0)?,
        content: row.get(1)?,
        timestamp,
        user_id: row.get(3)?,
        room_id: row.get(4)?,
    })
}

pub fn get_message(conn: &Connection, id: i64) -> Result<Option<ChatMessage>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM chat_messages WHERE id = ?1"
    ))?;
    Ok(stmt.query_row([id], row_to_msg).optional()?)
}

/// All messages written by a user, oldest first.
pub fn list_by_user(conn: &Connection, user_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM chat_messages WHERE user_id = ?1 ORDER BY timestamp, id"
    ))?;
    let msgs = stmt
        .query_map([user_id], row_to_msg)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(msgs)
}

/// All messages in a room, oldest first.
pub fn list_room(conn: &Connection, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM chat_messages WHERE room_id = ?1 ORDER BY timestamp, id"
    ))?;
    let msgs = stmt
        .query_map([room_id], row_to_msg)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(msgs)
}
