use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::bot::{
    constants::misc::{MAX_VALUE, PAGE_SIZE, UNKNOWN_MEMBER},
    models::{
        Participant, PendingAction, Session, SessionStatus, Transaction, TransactionDraft,
    },
    optimizer::{calculate_settlement as optimize_session, Settlement},
    store::{LedgerStore, StoreError},
};

/* Processor.
 * Business operations between the handlers and the ledger store. Store failures are
 * converted here, so handlers only ever see a ProcessError.
 */

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Session \"{0}\" has already ended")]
    SessionEnded(String),
    #[error("Store failure: {0}")]
    StoreFailure(StoreError),
}

impl From<StoreError> for ProcessError {
    fn from(err: StoreError) -> ProcessError {
        match err {
            StoreError::NotFound { kind, id } => ProcessError::NotFound(format!("{kind} {id}")),
            err => ProcessError::StoreFailure(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub number: usize,
    pub transaction_id: String,
    pub payer: String,
    pub consumer: String,
    pub amount: i64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub rows: Vec<TransactionRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/* Session lifecycle */

// Creates a session named by the user, registers its founder and focuses it.
pub fn create_session(
    store: &dyn LedgerStore,
    chat_id: &str,
    name: &str,
    founder: &Participant,
) -> Result<Session, ProcessError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProcessError::InvalidInput(
            "Please give the session a name!".to_string(),
        ));
    }

    let session = Session::new(chat_id, name);
    let member = founder.to_member(&session.id);
    store.create_session(&session, Some(&member))?;
    store.set_focused_session(chat_id, &session.id)?;

    log::info!(
        "Session {} ({}) created in chat {} by {}",
        session.id,
        session.name,
        chat_id,
        founder.display_name()
    );
    Ok(session)
}

pub fn get_session(store: &dyn LedgerStore, session_id: &str) -> Result<Session, ProcessError> {
    Ok(store.get_session(session_id)?)
}

pub fn list_sessions(store: &dyn LedgerStore, chat_id: &str) -> Result<Vec<Session>, ProcessError> {
    Ok(store.list_sessions(chat_id)?)
}

// Ends an active session. Clears the chat focus if it pointed at this session.
pub fn end_session(
    store: &dyn LedgerStore,
    chat_id: &str,
    session_id: &str,
) -> Result<Session, ProcessError> {
    let session = store.get_session(session_id)?;
    if !session.is_active() {
        return Err(ProcessError::SessionEnded(session.name));
    }

    let session =
        store.update_session_status(session_id, SessionStatus::Ended, Some(Utc::now()))?;
    let state = store.get_chat_state(chat_id)?;
    if state.focused_session_id.as_deref() == Some(session_id) {
        store.clear_focused_session(chat_id)?;
    }

    log::info!("Session {} ended in chat {}", session_id, chat_id);
    Ok(session)
}

// Reopens a session and focuses it. Reopening an active session changes nothing else.
pub fn reopen_session(
    store: &dyn LedgerStore,
    chat_id: &str,
    session_id: &str,
) -> Result<Session, ProcessError> {
    let session = store.get_session(session_id)?;
    let session = if session.is_active() {
        session
    } else {
        store.update_session_status(session_id, SessionStatus::Active, None)?
    };
    store.set_focused_session(chat_id, session_id)?;
    Ok(session)
}

/* Focus */

pub fn set_focus(
    store: &dyn LedgerStore,
    chat_id: &str,
    session_id: &str,
) -> Result<Session, ProcessError> {
    let session = store.get_session(session_id)?;
    store.set_focused_session(chat_id, session_id)?;
    Ok(session)
}

// Resolves the focused session. A pointer to a missing session is cleared.
pub fn get_focus(store: &dyn LedgerStore, chat_id: &str) -> Result<Option<Session>, ProcessError> {
    let state = store.get_chat_state(chat_id)?;
    let session_id = match state.focused_session_id {
        Some(session_id) => session_id,
        None => return Ok(None),
    };

    match store.get_session(&session_id) {
        Ok(session) => Ok(Some(session)),
        Err(StoreError::NotFound { .. }) => {
            log::warn!(
                "Chat {} focused missing session {}, clearing focus",
                chat_id,
                session_id
            );
            store.clear_focused_session(chat_id)?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn clear_focus(store: &dyn LedgerStore, chat_id: &str) -> Result<(), ProcessError> {
    Ok(store.clear_focused_session(chat_id)?)
}

/* Pending actions */

pub fn set_pending(
    store: &dyn LedgerStore,
    chat_id: &str,
    action: &PendingAction,
) -> Result<(), ProcessError> {
    Ok(store.set_pending_action(chat_id, action)?)
}

pub fn get_pending(
    store: &dyn LedgerStore,
    chat_id: &str,
) -> Result<Option<PendingAction>, ProcessError> {
    Ok(store.get_chat_state(chat_id)?.pending_action)
}

pub fn clear_pending(store: &dyn LedgerStore, chat_id: &str) -> Result<(), ProcessError> {
    Ok(store.clear_pending_action(chat_id)?)
}

/* Members and transactions */

fn resolve_member(
    store: &dyn LedgerStore,
    session_id: &str,
    participant: &Participant,
) -> Result<String, ProcessError> {
    Ok(store
        .find_or_insert_member(&participant.to_member(session_id))?
        .id)
}

// Maps each participant's display name to a member id, creating members as needed.
// Participants are resolved one at a time.
pub fn resolve_members(
    store: &dyn LedgerStore,
    session_id: &str,
    participants: &[Participant],
) -> Result<HashMap<String, String>, ProcessError> {
    let mut resolved = HashMap::new();
    for participant in participants {
        let member_id = resolve_member(store, session_id, participant)?;
        resolved.insert(participant.display_name().to_string(), member_id);
    }
    Ok(resolved)
}

// Records drafts as transactions of an active session.
pub fn add_transactions(
    store: &dyn LedgerStore,
    session_id: &str,
    drafts: &[TransactionDraft],
) -> Result<Vec<Transaction>, ProcessError> {
    let session = store.get_session(session_id)?;
    if !session.is_active() {
        return Err(ProcessError::SessionEnded(session.name));
    }
    if drafts.iter().any(|draft| draft.amount < 0) {
        return Err(ProcessError::InvalidInput(
            "Amounts cannot be negative!".to_string(),
        ));
    }
    if drafts.iter().any(|draft| draft.amount > MAX_VALUE) {
        return Err(ProcessError::InvalidInput(format!(
            "Amounts cannot be larger than {MAX_VALUE}!"
        )));
    }

    let mut transactions = Vec::with_capacity(drafts.len());
    for draft in drafts {
        // Payer and consumer may share a display name across namespaces
        let payer_id = resolve_member(store, session_id, &draft.payer)?;
        let consumer_id = resolve_member(store, session_id, &draft.consumer)?;

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            payer_id,
            consumer_id,
            amount: draft.amount,
            description: draft.description.clone(),
            created_at: Utc::now(),
        };
        store.insert_transaction(&transaction)?;
        transactions.push(transaction);
    }

    log::info!(
        "Added {} transactions to session {}",
        transactions.len(),
        session_id
    );
    Ok(transactions)
}

pub fn delete_transaction(
    store: &dyn LedgerStore,
    session_id: &str,
    transaction_id: &str,
) -> Result<(), ProcessError> {
    store.delete_transaction(session_id, transaction_id)?;
    log::info!(
        "Deleted transaction {} from session {}",
        transaction_id,
        session_id
    );
    Ok(())
}

fn member_names(
    store: &dyn LedgerStore,
    session_id: &str,
) -> Result<HashMap<String, String>, ProcessError> {
    Ok(store
        .list_members(session_id)?
        .into_iter()
        .map(|member| (member.id, member.username))
        .collect())
}

fn name_of(names: &HashMap<String, String>, member_id: &str) -> String {
    names
        .get(member_id)
        .cloned()
        .unwrap_or(UNKNOWN_MEMBER.to_string())
}

// One page of the transaction list. Pages are 1-based and clamped into range.
pub fn list_transactions_page(
    store: &dyn LedgerStore,
    session_id: &str,
    page: usize,
) -> Result<TransactionPage, ProcessError> {
    let transactions = store.list_transactions(session_id)?;
    let names = member_names(store, session_id)?;

    let total = transactions.len();
    let total_pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;

    let rows = transactions
        .iter()
        .enumerate()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|(i, transaction)| TransactionRow {
            number: i + 1,
            transaction_id: transaction.id.clone(),
            payer: name_of(&names, &transaction.payer_id),
            consumer: name_of(&names, &transaction.consumer_id),
            amount: transaction.amount,
            description: transaction.description.clone(),
        })
        .collect();

    Ok(TransactionPage {
        rows,
        page,
        total_pages,
        total,
    })
}

// Every transaction of a session, with member names, in creation order.
pub fn list_transaction_rows(
    store: &dyn LedgerStore,
    session_id: &str,
) -> Result<Vec<TransactionRow>, ProcessError> {
    let transactions = store.list_transactions(session_id)?;
    let names = member_names(store, session_id)?;
    Ok(transactions
        .iter()
        .enumerate()
        .map(|(i, transaction)| TransactionRow {
            number: i + 1,
            transaction_id: transaction.id.clone(),
            payer: name_of(&names, &transaction.payer_id),
            consumer: name_of(&names, &transaction.consumer_id),
            amount: transaction.amount,
            description: transaction.description.clone(),
        })
        .collect())
}

// Loads a session snapshot and runs the settlement engine over it.
pub fn calculate_settlement(
    store: &dyn LedgerStore,
    session_id: &str,
) -> Result<Settlement, ProcessError> {
    let members = store.list_members(session_id)?;
    let transactions = store.list_transactions(session_id)?;
    Ok(optimize_session(&members, &transactions))
}
