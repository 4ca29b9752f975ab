use serde::{Deserialize, Serialize};

/// The author side of a message. Owned by the user directory, messages
/// only hold its id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
}
