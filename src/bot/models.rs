use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bot::oracle::ReceiptScan;

/* Ledger records.
 * Everything here is persisted by a LedgerStore, either as JSON or as hash fields.
 */

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub chat_id: String,
    pub name: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(chat_id: &str, name: &str) -> Session {
        Session {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            name: name.to_string(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemberKind {
    Platform { user_id: u64 },
    FreeText,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub session_id: String,
    pub kind: MemberKind,
    pub username: String,
}

impl Member {
    // Key of the uniqueness namespace this member lives in.
    // Platform members are keyed by user id, free-text members by exact name.
    pub fn identity_key(&self) -> String {
        match self.kind {
            MemberKind::Platform { user_id } => format!("platform:{user_id}"),
            MemberKind::FreeText => format!("free_text:{}", self.username),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub session_id: String,
    pub payer_id: String,
    pub consumer_id: String,
    pub amount: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/* Participant descriptors.
 * What a caller knows about a person before the member resolver has run.
 */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Participant {
    Platform { user_id: u64, display_name: String },
    FreeText { display_name: String },
}

impl Participant {
    pub fn display_name(&self) -> &str {
        match self {
            Participant::Platform { display_name, .. } => display_name,
            Participant::FreeText { display_name } => display_name,
        }
    }

    pub fn to_member(&self, session_id: &str) -> Member {
        let kind = match self {
            Participant::Platform { user_id, .. } => MemberKind::Platform { user_id: *user_id },
            Participant::FreeText { .. } => MemberKind::FreeText,
        };
        Member {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            kind,
            username: self.display_name().to_string(),
        }
    }
}

// A transaction before member ids are known.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub payer: Participant,
    pub consumer: Participant,
    pub amount: i64,
    pub description: String,
}

/* Per-chat conversation state.
 * Both fields are optional and updated independently of each other.
 */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ChatState {
    pub focused_session_id: Option<String>,
    pub pending_action: Option<PendingAction>,
}

// Suspended receipt flow. No pending action at all is represented by None.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PendingAction {
    OcrConfirmation {
        session_id: String,
        receipt: ReceiptScan,
    },
    OcrAllocation {
        session_id: String,
        receipt: ReceiptScan,
        payer: Participant,
    },
}

impl PendingAction {
    pub fn session_id(&self) -> &str {
        match self {
            PendingAction::OcrConfirmation { session_id, .. } => session_id,
            PendingAction::OcrAllocation { session_id, .. } => session_id,
        }
    }
}
