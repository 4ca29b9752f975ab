//! Record types shared by the chat store and its HTTP surface.

pub mod message;
pub mod timefmt;
pub mod user;

pub use message::{
    ChatMessage, MessageView, NewChatMessage, ResolvedMessage, DEFAULT_ROOM, MAX_ROOM_LEN,
};
pub use timefmt::TimestampError;
pub use user::User;
