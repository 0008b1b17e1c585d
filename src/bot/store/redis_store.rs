use std::collections::HashMap;

use chrono::{DateTime, Utc};
use redis::{Commands, Connection};

use crate::bot::{
    constants::redis::{
        CHAT_SESSIONS_KEY, CHAT_STATE_KEY, FIELD_FOCUSED_SESSION, FIELD_PENDING_ACTION,
        MEMBER_INDEX_KEY, MEMBER_KEY, SESSION_KEY, TRANSACTION_KEY, TRANSACTION_ORDER_KEY,
        TRANSACTION_SEQ_KEY,
    },
    models::{ChatState, Member, PendingAction, Session, SessionStatus, Transaction},
};

use super::{LedgerStore, RecordKind, StoreError};

/* Redis-backed ledger.
 * Records are stored as JSON strings. Ordering is kept in sorted sets, and member
 * identities are claimed with HSETNX on a per-session index.
 */
pub struct RedisStore {
    client: redis::Client,
}

fn key(prefix: &str, id: &str) -> String {
    format!("{prefix}:{id}")
}

impl RedisStore {
    pub fn open(url: &str) -> Result<RedisStore, StoreError> {
        let client = redis::Client::open(url)?;
        Ok(RedisStore { client })
    }

    fn connection(&self) -> Result<Connection, StoreError> {
        Ok(self.client.get_connection()?)
    }

    fn fetch_session(con: &mut Connection, session_id: &str) -> Result<Session, StoreError> {
        let raw: Option<String> = con.get(key(SESSION_KEY, session_id))?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Err(StoreError::not_found(RecordKind::Session, session_id)),
        }
    }

    fn assert_session_exists(con: &mut Connection, session_id: &str) -> Result<(), StoreError> {
        let exists: bool = con.exists(key(SESSION_KEY, session_id))?;
        if exists {
            Ok(())
        } else {
            Err(StoreError::not_found(RecordKind::Session, session_id))
        }
    }

    fn fetch_member(
        con: &mut Connection,
        session_id: &str,
        member_id: &str,
    ) -> Result<Member, StoreError> {
        let raw: Option<String> = con.hget(key(MEMBER_KEY, session_id), member_id)?;
        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Err(StoreError::not_found(RecordKind::Member, member_id)),
        }
    }
}

impl LedgerStore for RedisStore {
    fn create_session(&self, session: &Session, founder: Option<&Member>) -> Result<(), StoreError> {
        let mut con = self.connection()?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(key(SESSION_KEY, &session.id), serde_json::to_string(session)?)
            .ignore()
            .zadd(
                key(CHAT_SESSIONS_KEY, &session.chat_id),
                &session.id,
                session.created_at.timestamp_millis(),
            )
            .ignore();

        if let Some(member) = founder {
            pipe.hset(
                key(MEMBER_KEY, &session.id),
                &member.id,
                serde_json::to_string(member)?,
            )
            .ignore()
            .hset(
                key(MEMBER_INDEX_KEY, &session.id),
                member.identity_key(),
                &member.id,
            )
            .ignore();
        }

        let _: () = pipe.query(&mut con)?;
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Session, StoreError> {
        let mut con = self.connection()?;
        RedisStore::fetch_session(&mut con, session_id)
    }

    fn list_sessions(&self, chat_id: &str) -> Result<Vec<Session>, StoreError> {
        let mut con = self.connection()?;
        let ids: Vec<String> = con.zrevrange(key(CHAT_SESSIONS_KEY, chat_id), 0, -1)?;

        let mut sessions = Vec::new();
        for id in ids {
            match RedisStore::fetch_session(&mut con, &id) {
                Ok(session) => sessions.push(session),
                Err(StoreError::NotFound { .. }) => {
                    log::warn!("Session {} is indexed for chat {} but missing", id, chat_id);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(sessions)
    }

    fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<Session, StoreError> {
        let mut con = self.connection()?;
        let mut session = RedisStore::fetch_session(&mut con, session_id)?;
        session.status = status;
        session.ended_at = ended_at;
        let _: () = con.set(key(SESSION_KEY, session_id), serde_json::to_string(&session)?)?;
        Ok(session)
    }

    fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut con = self.connection()?;
        let session_id = &transaction.session_id;
        RedisStore::assert_session_exists(&mut con, session_id)?;

        // Sequence numbers keep the order stable for equal timestamps.
        let seq: i64 = con.incr(key(TRANSACTION_SEQ_KEY, session_id), 1)?;
        let _: () = redis::pipe()
            .atomic()
            .hset(
                key(TRANSACTION_KEY, session_id),
                &transaction.id,
                serde_json::to_string(transaction)?,
            )
            .ignore()
            .zadd(key(TRANSACTION_ORDER_KEY, session_id), &transaction.id, seq)
            .ignore()
            .query(&mut con)?;
        Ok(())
    }

    fn list_transactions(&self, session_id: &str) -> Result<Vec<Transaction>, StoreError> {
        let mut con = self.connection()?;
        RedisStore::assert_session_exists(&mut con, session_id)?;

        let ids: Vec<String> = con.zrange(key(TRANSACTION_ORDER_KEY, session_id), 0, -1)?;
        let records: HashMap<String, String> = con.hgetall(key(TRANSACTION_KEY, session_id))?;

        let mut transactions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(raw) = records.get(&id) {
                transactions.push(serde_json::from_str(raw)?);
            }
        }
        Ok(transactions)
    }

    fn delete_transaction(&self, session_id: &str, transaction_id: &str) -> Result<(), StoreError> {
        let mut con = self.connection()?;
        RedisStore::assert_session_exists(&mut con, session_id)?;

        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .hdel(key(TRANSACTION_KEY, session_id), transaction_id)
            .zrem(key(TRANSACTION_ORDER_KEY, session_id), transaction_id)
            .query(&mut con)?;

        if removed == 0 {
            Err(StoreError::not_found(RecordKind::Transaction, transaction_id))
        } else {
            Ok(())
        }
    }

    fn list_members(&self, session_id: &str) -> Result<Vec<Member>, StoreError> {
        let mut con = self.connection()?;
        RedisStore::assert_session_exists(&mut con, session_id)?;

        let records: HashMap<String, String> = con.hgetall(key(MEMBER_KEY, session_id))?;
        let mut members = records
            .values()
            .map(|raw| serde_json::from_str::<Member>(raw))
            .collect::<Result<Vec<Member>, serde_json::Error>>()?;

        // Hashes are unordered
        members.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.id.cmp(&b.id)));
        Ok(members)
    }

    fn find_or_insert_member(&self, member: &Member) -> Result<Member, StoreError> {
        let mut con = self.connection()?;
        let session_id = &member.session_id;
        RedisStore::assert_session_exists(&mut con, session_id)?;

        let index_key = key(MEMBER_INDEX_KEY, session_id);
        let identity = member.identity_key();
        let existing: Option<String> = con.hget(&index_key, &identity)?;
        if let Some(member_id) = existing {
            return RedisStore::fetch_member(&mut con, session_id, &member_id);
        }

        // Write the record first, then claim the identity. The loser of a race removes
        // its record and returns the winner's.
        let _: () = con.hset(
            key(MEMBER_KEY, session_id),
            &member.id,
            serde_json::to_string(member)?,
        )?;
        let claimed: bool = con.hset_nx(&index_key, &identity, &member.id)?;
        if claimed {
            return Ok(member.clone());
        }

        let _: () = con.hdel(key(MEMBER_KEY, session_id), &member.id)?;
        let winner: String = con.hget(&index_key, &identity)?;
        RedisStore::fetch_member(&mut con, session_id, &winner)
    }

    fn get_chat_state(&self, chat_id: &str) -> Result<ChatState, StoreError> {
        let mut con = self.connection()?;
        let fields: HashMap<String, String> = con.hgetall(key(CHAT_STATE_KEY, chat_id))?;

        let pending_action = match fields.get(FIELD_PENDING_ACTION) {
            Some(raw) => Some(serde_json::from_str::<PendingAction>(raw)?),
            None => None,
        };
        Ok(ChatState {
            focused_session_id: fields.get(FIELD_FOCUSED_SESSION).cloned(),
            pending_action,
        })
    }

    fn set_focused_session(&self, chat_id: &str, session_id: &str) -> Result<(), StoreError> {
        let mut con = self.connection()?;
        let _: () = con.hset(key(CHAT_STATE_KEY, chat_id), FIELD_FOCUSED_SESSION, session_id)?;
        Ok(())
    }

    fn clear_focused_session(&self, chat_id: &str) -> Result<(), StoreError> {
        let mut con = self.connection()?;
        let _: () = con.hdel(key(CHAT_STATE_KEY, chat_id), FIELD_FOCUSED_SESSION)?;
        Ok(())
    }

    fn set_pending_action(&self, chat_id: &str, action: &PendingAction) -> Result<(), StoreError> {
        let mut con = self.connection()?;
        let _: () = con.hset(
            key(CHAT_STATE_KEY, chat_id),
            FIELD_PENDING_ACTION,
            serde_json::to_string(action)?,
        )?;
        Ok(())
    }

    fn clear_pending_action(&self, chat_id: &str) -> Result<(), StoreError> {
        let mut con = self.connection()?;
        let _: () = con.hdel(key(CHAT_STATE_KEY, chat_id), FIELD_PENDING_ACTION)?;
        Ok(())
    }
}

// These need a running Redis server: REDIS_URL, or a local default.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::models::Participant;

    fn store() -> RedisStore {
        let url = std::env::var("REDIS_URL").unwrap_or("redis://127.0.0.1/".to_string());
        RedisStore::open(&url).unwrap()
    }

    #[test]
    #[ignore = "requires a running redis server"]
    fn test_redis_session_and_members() {
        let store = store();
        let chat_id = format!("test-{}", uuid::Uuid::new_v4());
        let session = Session::new(&chat_id, "Nongkrong");
        let founder = Participant::Platform {
            user_id: 7,
            display_name: "rio".to_string(),
        }
        .to_member(&session.id);
        store.create_session(&session, Some(&founder)).unwrap();

        assert_eq!(store.get_session(&session.id).unwrap(), session);
        assert_eq!(store.list_sessions(&chat_id).unwrap().len(), 1);

        let again = Participant::Platform {
            user_id: 7,
            display_name: "rio".to_string(),
        }
        .to_member(&session.id);
        assert_eq!(store.find_or_insert_member(&again).unwrap().id, founder.id);
        assert_eq!(store.list_members(&session.id).unwrap().len(), 1);
    }

    #[test]
    #[ignore = "requires a running redis server"]
    fn test_redis_transactions_keep_order() {
        let store = store();
        let chat_id = format!("test-{}", uuid::Uuid::new_v4());
        let session = Session::new(&chat_id, "Makan");
        store.create_session(&session, None).unwrap();

        let mut ids = Vec::new();
        for amount in [10, 20, 30] {
            let transaction = Transaction {
                id: uuid::Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                payer_id: "a".to_string(),
                consumer_id: "b".to_string(),
                amount,
                description: "test".to_string(),
                created_at: Utc::now(),
            };
            store.insert_transaction(&transaction).unwrap();
            ids.push(transaction.id);
        }

        let listed = store.list_transactions(&session.id).unwrap();
        let listed_ids: Vec<String> = listed.iter().map(|t| t.id.clone()).collect();
        assert_eq!(listed_ids, ids);

        store.delete_transaction(&session.id, &ids[1]).unwrap();
        assert_eq!(store.list_transactions(&session.id).unwrap().len(), 2);
        assert!(matches!(
            store.delete_transaction(&session.id, &ids[1]),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    #[ignore = "requires a running redis server"]
    fn test_redis_chat_state_fields_are_independent() {
        let store = store();
        let chat_id = format!("test-{}", uuid::Uuid::new_v4());
        store.set_focused_session(&chat_id, "s1").unwrap();
        store.clear_pending_action(&chat_id).unwrap();

        let state = store.get_chat_state(&chat_id).unwrap();
        assert_eq!(state.focused_session_id.as_deref(), Some("s1"));
        assert_eq!(state.pending_action, None);
    }
}
