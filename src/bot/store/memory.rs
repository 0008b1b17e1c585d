use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};

use crate::bot::models::{ChatState, Member, PendingAction, Session, SessionStatus, Transaction};

use super::{LedgerStore, RecordKind, StoreError};

#[derive(Default)]
struct Ledger {
    sessions: HashMap<String, Session>,
    members: HashMap<String, Vec<Member>>,
    transactions: HashMap<String, Vec<Transaction>>,
    chat_states: HashMap<String, ChatState>,
}

impl Ledger {
    fn assert_session_exists(&self, session_id: &str) -> Result<(), StoreError> {
        if self.sessions.contains_key(session_id) {
            Ok(())
        } else {
            Err(StoreError::not_found(RecordKind::Session, session_id))
        }
    }
}

/* In-process ledger behind a single mutex.
 * Used for tests and for running the bot without Redis. Nothing survives a restart.
 */
#[derive(Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, StoreError> {
        self.ledger.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl LedgerStore for MemoryStore {
    fn create_session(&self, session: &Session, founder: Option<&Member>) -> Result<(), StoreError> {
        let mut ledger = self.lock()?;
        ledger.sessions.insert(session.id.clone(), session.clone());
        let members = ledger.members.entry(session.id.clone()).or_default();
        if let Some(member) = founder {
            members.push(member.clone());
        }
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Session, StoreError> {
        let ledger = self.lock()?;
        ledger
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(RecordKind::Session, session_id))
    }

    fn list_sessions(&self, chat_id: &str) -> Result<Vec<Session>, StoreError> {
        let ledger = self.lock()?;
        let mut sessions: Vec<Session> = ledger
            .sessions
            .values()
            .filter(|session| session.chat_id == chat_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(sessions)
    }

    fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<Session, StoreError> {
        let mut ledger = self.lock()?;
        let session = ledger
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Session, session_id))?;
        session.status = status;
        session.ended_at = ended_at;
        Ok(session.clone())
    }

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut ledger = self.lock()?;
        ledger.assert_session_exists(&transaction.session_id)?;
        ledger
            .transactions
            .entry(transaction.session_id.clone())
            .or_default()
            .push(transaction.clone());
        Ok(())
    }

    fn list_transactions(&self, session_id: &str) -> Result<Vec<Transaction>, StoreError> {
        let ledger = self.lock()?;
        ledger.assert_session_exists(session_id)?;
        Ok(ledger
            .transactions
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    fn delete_transaction(&self, session_id: &str, transaction_id: &str) -> Result<(), StoreError> {
        let mut ledger = self.lock()?;
        ledger.assert_session_exists(session_id)?;
        let transactions = ledger.transactions.entry(session_id.to_string()).or_default();
        match transactions.iter().position(|t| t.id == transaction_id) {
            Some(pos) => {
                transactions.remove(pos);
                Ok(())
            }
            None => Err(StoreError::not_found(RecordKind::Transaction, transaction_id)),
        }
    }

    fn list_members(&self, session_id: &str) -> Result<Vec<Member>, StoreError> {
        let ledger = self.lock()?;
        ledger.assert_session_exists(session_id)?;
        Ok(ledger.members.get(session_id).cloned().unwrap_or_default())
    }

    fn find_or_insert_member(&self, member: &Member) -> Result<Member, StoreError> {
        let mut ledger = self.lock()?;
        ledger.assert_session_exists(&member.session_id)?;
        let members = ledger.members.entry(member.session_id.clone()).or_default();
        let identity = member.identity_key();
        if let Some(existing) = members.iter().find(|m| m.identity_key() == identity) {
            return Ok(existing.clone());
        }
        members.push(member.clone());
        Ok(member.clone())
    }

    fn get_chat_state(&self, chat_id: &str) -> Result<ChatState, StoreError> {
        let ledger = self.lock()?;
        Ok(ledger.chat_states.get(chat_id).cloned().unwrap_or_default())
    }

    fn set_focused_session(&self, chat_id: &str, session_id: &str) -> Result<(), StoreError> {
        let mut ledger = self.lock()?;
        let state = ledger.chat_states.entry(chat_id.to_string()).or_default();
        state.focused_session_id = Some(session_id.to_string());
        Ok(())
    }

    fn clear_focused_session(&self, chat_id: &str) -> Result<(), StoreError> {
        let mut ledger = self.lock()?;
        if let Some(state) = ledger.chat_states.get_mut(chat_id) {
            state.focused_session_id = None;
        }
        Ok(())
    }

    fn set_pending_action(&self, chat_id: &str, action: &PendingAction) -> Result<(), StoreError> {
        let mut ledger = self.lock()?;
        let state = ledger.chat_states.entry(chat_id.to_string()).or_default();
        state.pending_action = Some(action.clone());
        Ok(())
    }

    fn clear_pending_action(&self, chat_id: &str) -> Result<(), StoreError> {
        let mut ledger = self.lock()?;
        if let Some(state) = ledger.chat_states.get_mut(chat_id) {
            state.pending_action = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::models::Participant;

    fn transaction(session_id: &str, amount: i64) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            payer_id: "payer".to_string(),
            consumer_id: "consumer".to_string(),
            amount,
            description: "kopi".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_session_is_not_empty() {
        let store = MemoryStore::new();
        let session = Session::new("chat", "Kopi");
        store.create_session(&session, None).unwrap();

        assert!(store.list_transactions(&session.id).unwrap().is_empty());
        assert!(matches!(
            store.list_transactions("nope"),
            Err(StoreError::NotFound {
                kind: RecordKind::Session,
                ..
            })
        ));
        assert!(matches!(
            store.get_session("nope"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_transactions_in_insertion_order() {
        let store = MemoryStore::new();
        let session = Session::new("chat", "Kopi");
        store.create_session(&session, None).unwrap();

        let first = transaction(&session.id, 1);
        let second = transaction(&session.id, 2);
        store.insert_transaction(&first).unwrap();
        store.insert_transaction(&second).unwrap();

        let listed = store.list_transactions(&session.id).unwrap();
        assert_eq!(listed, vec![first.clone(), second.clone()]);

        store.delete_transaction(&session.id, &first.id).unwrap();
        assert_eq!(store.list_transactions(&session.id).unwrap(), vec![second]);
        assert!(matches!(
            store.delete_transaction(&session.id, &first.id),
            Err(StoreError::NotFound {
                kind: RecordKind::Transaction,
                ..
            })
        ));
    }

    #[test]
    fn test_sessions_newest_first() {
        let store = MemoryStore::new();
        let mut older = Session::new("chat", "Old");
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        let newer = Session::new("chat", "New");
        let elsewhere = Session::new("other", "Elsewhere");
        store.create_session(&older, None).unwrap();
        store.create_session(&newer, None).unwrap();
        store.create_session(&elsewhere, None).unwrap();

        let names: Vec<String> = store
            .list_sessions("chat")
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["New", "Old"]);
    }

    #[test]
    fn test_sessions_created_together_keep_a_stable_order() {
        let store = MemoryStore::new();
        let created_at = Utc::now();
        for name in ["A", "B", "C", "D"] {
            let mut session = Session::new("chat", name);
            session.created_at = created_at;
            store.create_session(&session, None).unwrap();
        }

        let ids: Vec<String> = store
            .list_sessions("chat")
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        let mut expected = ids.clone();
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_member_upsert_by_identity() {
        let store = MemoryStore::new();
        let session = Session::new("chat", "Kopi");
        store.create_session(&session, None).unwrap();

        let rio = Participant::FreeText {
            display_name: "Rio".to_string(),
        };
        let first = store.find_or_insert_member(&rio.to_member(&session.id)).unwrap();
        let second = store.find_or_insert_member(&rio.to_member(&session.id)).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_members(&session.id).unwrap().len(), 1);
    }

    #[test]
    fn test_chat_state_fields_are_independent() {
        let store = MemoryStore::new();
        store.set_focused_session("chat", "s1").unwrap();
        store.clear_pending_action("chat").unwrap();
        assert_eq!(
            store.get_chat_state("chat").unwrap().focused_session_id.as_deref(),
            Some("s1")
        );

        store.clear_focused_session("chat").unwrap();
        assert_eq!(store.get_chat_state("chat").unwrap(), ChatState::default());
    }
}
