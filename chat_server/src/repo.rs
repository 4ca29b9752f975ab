use crate::{db::DbPool, error::StoreError, messages, users};
use chat_model::{ChatMessage, MessageView, NewChatMessage, User};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;
use tracing::warn;

/// Data access for chat messages and the users they reference.
///
/// Author resolution is an explicit [`ChatRepository::get_user`] call; the
/// provided [`ChatRepository::view`] helpers use it to build projections.
pub trait ChatRepository: Send + Sync {
    fn create(&self, new: NewChatMessage) -> Result<ChatMessage, StoreError>;
    fn get(&self, id: i64) -> Result<Option<ChatMessage>, StoreError>;
    /// Messages written by `user_id`, oldest first.
    fn list_by_user(&self, user_id: i64) -> Result<Vec<ChatMessage>, StoreError>;
    /// Messages in `room_id`, oldest first.
    fn list_room(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    fn create_user(&self, username: &str) -> Result<User, StoreError>;
    fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Project a message for transport. Never fails: a lookup error leaves
    /// `username` unset.
    fn view(&self, msg: &ChatMessage) -> MessageView {
        let author = self.get_user(msg.user_id).unwrap_or_else(|e| {
            warn!(message_id = msg.id, user_id = msg.user_id, "author lookup failed: {e}");
            None
        });
        msg.to_view(author.as_ref())
    }

    /// Project a batch, looking each author up once.
    fn views(&self, msgs: &[ChatMessage]) -> Vec<MessageView> {
        let mut authors: HashMap<i64, Option<User>> = HashMap::new();
        msgs.iter()
            .map(|m| {
                let author = authors.entry(m.user_id).or_insert_with(|| {
                    self.get_user(m.user_id).unwrap_or_else(|e| {
                        warn!(message_id = m.id, user_id = m.user_id, "author lookup failed: {e}");
                        None
                    })
                });
                m.to_view(author.as_ref())
            })
            .collect()
    }
}

/// Repository backed by a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ChatRepository for SqliteRepository {
    fn create(&self, new: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let conn = self.pool.get()?;
        messages::create_message(&conn, new)
    }

    fn get(&self, id: i64) -> Result<Option<ChatMessage>, StoreError> {
        let conn = self.pool.get()?;
        messages::get_message(&conn, id)
    }

    fn list_by_user(&self, user_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let conn = self.pool.get()?;
        messages::list_by_user(&conn, user_id)
    }

    fn list_room(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let conn = self.pool.get()?;
        messages::list_room(&conn, room_id)
    }

    fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let conn = self.pool.get()?;
        users::create_user(&conn, username)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;
        users::get_user(&conn, id)
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.pool.get()?;
        users::list_users(&conn)
    }
}

#[derive(Default)]
struct MemoryTables {
    users: BTreeMap<i64, User>,
    messages: BTreeMap<i64, ChatMessage>,
    next_user_id: i64,
    next_message_id: i64,
}

/// Process-local repository with the same integrity rules as the SQLite one.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<MemoryTables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut msgs: Vec<ChatMessage>) -> Vec<ChatMessage> {
        msgs.sort_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id)));
        msgs
    }
}

impl ChatRepository for MemoryRepository {
    fn create(&self, new: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let msg = new.resolve(OffsetDateTime::now_utc())?;
        messages::validate(&msg)?;
        let mut tables = self.tables.lock();
        if !tables.users.contains_key(&msg.user_id) {
            return Err(StoreError::UnknownUser(msg.user_id));
        }
        tables.next_message_id += 1;
        let msg = msg.into_message(tables.next_message_id);
        tables.messages.insert(msg.id, msg.clone());
        Ok(msg)
    }

    fn get(&self, id: i64) -> Result<Option<ChatMessage>, StoreError> {
        Ok(self.tables.lock().messages.get(&id).cloned())
    }

    fn list_by_user(&self, user_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let msgs = self
            .tables
            .lock()
            .messages
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        Ok(Self::sorted(msgs))
    }

    fn list_room(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let msgs = self
            .tables
            .lock()
            .messages
            .values()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        Ok(Self::sorted(msgs))
    }

    fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let username = users::normalize_username(username)?;
        let mut tables = self.tables.lock();
        if tables
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(username))
        {
            return Err(StoreError::DuplicateUser(username.to_string()));
        }
        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            username: username.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().users.get(&id).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.lock().users.values().cloned().collect())
    }
}
