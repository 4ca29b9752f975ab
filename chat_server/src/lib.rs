pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod messages;
pub mod repo;
pub mod users;

pub use error::StoreError;
pub use repo::{ChatRepository, MemoryRepository, SqliteRepository};
