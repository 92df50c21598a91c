use serde::{Deserialize, Serialize};

/// A stored message. `id` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub date: String,
}

/// A decoded message that has not been inserted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub date: String,
}

impl NewRecord {
    #[cfg(test)]
    pub fn with_id(self, id: i64) -> Record {
        Record {
            id,
            sender: self.sender,
            subject: self.subject,
            body: self.body,
            date: self.date,
        }
    }
}

/// An IMAP sequence number within the selected folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u32);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
