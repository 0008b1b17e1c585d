use std::fmt;

use chrono::{DateTime, Utc};

use crate::bot::models::{ChatState, Member, PendingAction, Session, SessionStatus, Transaction};

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

mod memory;
mod redis_store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Session,
    Member,
    Transaction,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Session => write!(f, "Session"),
            RecordKind::Member => write!(f, "Member"),
            RecordKind::Transaction => write!(f, "Transaction"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn not_found(kind: RecordKind, id: &str) -> StoreError {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/* Persistence contract for sessions, members, transactions and chat states.
 * Everything is keyed by session id or chat id. A missing session is a NotFound error,
 * which callers must be able to tell apart from an empty listing.
 */
pub trait LedgerStore: Send + Sync {
    // Writes a session, and its founding member if given, in one step.
    fn create_session(&self, session: &Session, founder: Option<&Member>) -> Result<(), StoreError>;
    fn get_session(&self, session_id: &str) -> Result<Session, StoreError>;
    // Newest first.
    fn list_sessions(&self, chat_id: &str) -> Result<Vec<Session>, StoreError>;
    fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<Session, StoreError>;

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError>;
    // Oldest first, in insertion order.
    fn list_transactions(&self, session_id: &str) -> Result<Vec<Transaction>, StoreError>;
    fn delete_transaction(&self, session_id: &str, transaction_id: &str) -> Result<(), StoreError>;

    fn list_members(&self, session_id: &str) -> Result<Vec<Member>, StoreError>;
    // Upsert by identity key. Returns the stored member, which may be an older record.
    fn find_or_insert_member(&self, member: &Member) -> Result<Member, StoreError>;

    fn get_chat_state(&self, chat_id: &str) -> Result<ChatState, StoreError>;
    fn set_focused_session(&self, chat_id: &str, session_id: &str) -> Result<(), StoreError>;
    fn clear_focused_session(&self, chat_id: &str) -> Result<(), StoreError>;
    fn set_pending_action(&self, chat_id: &str, action: &PendingAction) -> Result<(), StoreError>;
    fn clear_pending_action(&self, chat_id: &str) -> Result<(), StoreError>;
}
