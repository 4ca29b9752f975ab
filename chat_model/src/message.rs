use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::timefmt::{self, TimestampError};
use crate::User;

/// Room a message lands in when the caller does not name one.
pub const DEFAULT_ROOM: &str = "general";

/// Longest room id the store accepts, in characters.
pub const MAX_ROOM_LEN: usize = 100;

/// Characters of content shown by the `Debug` representation.
const DEBUG_PREVIEW_CHARS: usize = 50;

/// A persisted chat message.
///
/// Only the store hands these out, so `id` is always the assigned identity.
/// `timestamp` is optional because rows written outside this crate may carry
/// no value.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: i64,
    pub content: String,
    pub timestamp: Option<OffsetDateTime>,
    pub user_id: i64,
    pub room_id: String,
}

impl ChatMessage {
    /// Plain-data projection for transport. `author` is the user the caller
    /// resolved for `user_id`, if any; an unresolved author yields a `null`
    /// username rather than an error.
    pub fn to_view(&self, author: Option<&User>) -> MessageView {
        MessageView {
            id: self.id,
            content: self.content.clone(),
            timestamp: self.timestamp.and_then(timefmt::to_iso8601),
            user_id: self.user_id,
            username: author
                .filter(|u| u.id == self.user_id)
                .map(|u| u.username.clone()),
            room_id: self.room_id.clone(),
        }
    }
}

impl fmt::Debug for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.content.chars().take(DEBUG_PREVIEW_CHARS).collect();
        write!(f, "<ChatMessage {}: {}...>", self.id, preview)
    }
}

/// Wire shape of a message. Field order is the serialized key order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: i64,
    pub content: String,
    pub timestamp: Option<String>,
    pub user_id: i64,
    pub username: Option<String>,
    pub room_id: String,
}

/// Input for creating a message. `room_id` and `timestamp` are optional and
/// filled by [`NewChatMessage::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub content: String,
    pub user_id: i64,
    pub room_id: Option<String>,
    pub timestamp: Option<OffsetDateTime>,
}

/// A [`NewChatMessage`] with its defaults applied, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub content: String,
    pub user_id: i64,
    pub room_id: String,
    pub timestamp: OffsetDateTime,
}

impl NewChatMessage {
    pub fn new(content: impl Into<String>, user_id: i64) -> Self {
        Self {
            content: content.into(),
            user_id,
            room_id: None,
            timestamp: None,
        }
    }

    pub fn with_room(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn with_timestamp(mut self, ts: OffsetDateTime) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Apply defaults: the `general` room and `now` for a missing timestamp.
    /// The timestamp is normalised to UTC; instants outside years 0..=9999
    /// in UTC are refused.
    pub fn resolve(self, now: OffsetDateTime) -> Result<ResolvedMessage, TimestampError> {
        let timestamp = timefmt::normalize_utc(self.timestamp.unwrap_or(now))
            .ok_or(TimestampError::OutOfRange)?;
        Ok(ResolvedMessage {
            content: self.content,
            user_id: self.user_id,
            room_id: self.room_id.unwrap_or_else(|| DEFAULT_ROOM.to_string()),
            timestamp,
        })
    }
}

impl ResolvedMessage {
    /// Attach the identity assigned by the store.
    pub fn into_message(self, id: i64) -> ChatMessage {
        ChatMessage {
            id,
            content: self.content,
            timestamp: Some(self.timestamp),
            user_id: self.user_id,
            room_id: self.room_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample(content: &str) -> ChatMessage {
        NewChatMessage::new(content, 7)
            .with_timestamp(datetime!(2024-05-01 12:00:00 UTC))
            .resolve(OffsetDateTime::now_utc())
            .unwrap()
            .into_message(3)
    }

    #[test]
    fn defaults_are_filled() {
        let now = datetime!(2024-05-01 12:00:00 UTC);
        let r = NewChatMessage::new("hi", 1).resolve(now).unwrap();
        assert_eq!(r.room_id, DEFAULT_ROOM);
        assert_eq!(r.timestamp, now);
    }

    #[test]
    fn explicit_values_win() {
        let ts = datetime!(2020-01-01 00:00:00 UTC);
        let r = NewChatMessage::new("hi", 1)
            .with_room("random")
            .with_timestamp(ts)
            .resolve(OffsetDateTime::now_utc())
            .unwrap();
        assert_eq!(r.room_id, "random");
        assert_eq!(r.timestamp, ts);
    }

    #[test]
    fn timestamp_is_normalised_to_utc() {
        let r = NewChatMessage::new("hi", 1)
            .with_timestamp(datetime!(2020-02-02 12:00:00 +02:00))
            .resolve(OffsetDateTime::now_utc())
            .unwrap();
        assert_eq!(r.timestamp.offset(), time::UtcOffset::UTC);
        assert_eq!(r.timestamp, datetime!(2020-02-02 10:00:00 UTC));
        let v = r.into_message(1).to_view(None);
        assert_eq!(v.timestamp.as_deref(), Some("2020-02-02T10:00:00Z"));
    }

    #[test]
    fn unrepresentable_timestamp_refused() {
        for ts in [
            datetime!(9999-12-31 23:30:00 -02:00),
            datetime!(0000-01-01 00:30:00 +01:00),
        ] {
            let res = NewChatMessage::new("hi", 1)
                .with_timestamp(ts)
                .resolve(OffsetDateTime::now_utc());
            assert!(matches!(res, Err(TimestampError::OutOfRange)));
        }
    }

    #[test]
    fn view_keys_are_ordered() {
        let user = User {
            id: 7,
            username: "alice".into(),
        };
        let s = serde_json::to_string(&sample("hello").to_view(Some(&user))).unwrap();
        assert_eq!(
            s,
            r#"{"id":3,"content":"hello","timestamp":"2024-05-01T12:00:00Z","user_id":7,"username":"alice","room_id":"general"}"#
        );
    }

    #[test]
    fn view_without_author_has_null_username() {
        let v = sample("hello").to_view(None);
        assert_eq!(v.username, None);
        let json = serde_json::to_value(&v).unwrap();
        assert!(json["username"].is_null());
    }

    #[test]
    fn view_ignores_mismatched_author() {
        let other = User {
            id: 8,
            username: "mallory".into(),
        };
        assert_eq!(sample("hello").to_view(Some(&other)).username, None);
    }

    #[test]
    fn view_without_timestamp_is_null() {
        let mut m = sample("hello");
        m.timestamp = None;
        let json = serde_json::to_value(m.to_view(None)).unwrap();
        assert!(json["timestamp"].is_null());
    }

    #[test]
    fn debug_truncates_to_fifty_chars() {
        let long = "é".repeat(80);
        let s = format!("{:?}", sample(&long));
        assert_eq!(s, format!("<ChatMessage 3: {}...>", "é".repeat(50)));
    }

    #[test]
    fn debug_short_content() {
        assert_eq!(format!("{:?}", sample("hey")), "<ChatMessage 3: hey...>");
    }
}
