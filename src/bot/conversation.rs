use crate::bot::{
    models::{Participant, PendingAction, Session, TransactionDraft},
    oracle::{self, ExtractedTransaction, ExtractionOracle, ItemAllocation, ReceiptScan},
    processor::{self, ProcessError},
    store::LedgerStore,
    utils::identity::normalize_participant,
};

/* Conversation.
 * Decides what a free-text message means for the chat: the next step of a pending
 * receipt, new transactions, a new session, or nothing. Handlers only render the
 * outcome.
 */

#[derive(Debug, Clone, PartialEq)]
pub enum TextOutcome {
    // Receipt flow
    PayerConfirmed(Participant),
    PayerUnclear,
    ReceiptRecorded(Vec<TransactionDraft>),
    AllocationFailed,
    ReceiptAbandoned(String),
    // Plain messages
    TransactionsRecorded(Vec<TransactionDraft>),
    NoActiveSession,
    Unclear,
    SessionStarted(Session),
    Ignored,
}

pub async fn handle_text(
    store: &dyn LedgerStore,
    oracle: &dyn ExtractionOracle,
    chat_id: &str,
    text: &str,
    sender: &Participant,
) -> Result<TextOutcome, ProcessError> {
    match processor::get_pending(store, chat_id)? {
        Some(PendingAction::OcrConfirmation {
            session_id,
            receipt,
        }) => confirm_payer(store, chat_id, text, sender, session_id, receipt),
        Some(PendingAction::OcrAllocation {
            session_id,
            receipt,
            payer,
        }) => {
            allocate_receipt(
                store,
                oracle,
                chat_id,
                text,
                sender,
                &session_id,
                &receipt,
                payer,
            )
            .await
        }
        None => record_text(store, oracle, chat_id, text, sender).await,
    }
}

// A receipt whose session has ended or vanished is dropped.
fn abandon_closed_receipt(
    store: &dyn LedgerStore,
    chat_id: &str,
    session_id: &str,
) -> Result<Option<TextOutcome>, ProcessError> {
    let name = match processor::get_session(store, session_id) {
        Ok(session) if session.is_active() => return Ok(None),
        Ok(session) => session.name,
        Err(ProcessError::NotFound(what)) => {
            log::warn!("Chat {}: receipt for missing {}, dropping it", chat_id, what);
            session_id.to_string()
        }
        Err(err) => return Err(err),
    };
    processor::clear_pending(store, chat_id)?;
    Ok(Some(TextOutcome::ReceiptAbandoned(name)))
}

fn confirm_payer(
    store: &dyn LedgerStore,
    chat_id: &str,
    text: &str,
    sender: &Participant,
    session_id: String,
    receipt: ReceiptScan,
) -> Result<TextOutcome, ProcessError> {
    if let Some(outcome) = abandon_closed_receipt(store, chat_id, &session_id)? {
        return Ok(outcome);
    }
    let payer = match normalize_participant(text, sender) {
        Some(payer) => payer,
        None => return Ok(TextOutcome::PayerUnclear),
    };

    let action = PendingAction::OcrAllocation {
        session_id,
        receipt,
        payer: payer.clone(),
    };
    processor::set_pending(store, chat_id, &action)?;
    Ok(TextOutcome::PayerConfirmed(payer))
}

#[allow(clippy::too_many_arguments)]
async fn allocate_receipt(
    store: &dyn LedgerStore,
    oracle: &dyn ExtractionOracle,
    chat_id: &str,
    text: &str,
    sender: &Participant,
    session_id: &str,
    receipt: &ReceiptScan,
    payer: Participant,
) -> Result<TextOutcome, ProcessError> {
    if let Some(outcome) = abandon_closed_receipt(store, chat_id, session_id)? {
        return Ok(outcome);
    }

    let allocations =
        oracle::allocate_items(oracle, text, &receipt.items, sender.display_name()).await;
    let drafts = match drafts_from_allocations(&allocations, &payer, sender) {
        Some(drafts) if !drafts.is_empty() => drafts,
        _ => {
            processor::clear_pending(store, chat_id)?;
            return Ok(TextOutcome::AllocationFailed);
        }
    };

    match processor::add_transactions(store, session_id, &drafts) {
        Ok(_) => {}
        Err(ProcessError::SessionEnded(name)) => {
            processor::clear_pending(store, chat_id)?;
            return Ok(TextOutcome::ReceiptAbandoned(name));
        }
        Err(ProcessError::NotFound(_)) => {
            processor::clear_pending(store, chat_id)?;
            return Ok(TextOutcome::ReceiptAbandoned(session_id.to_string()));
        }
        Err(err) => return Err(err),
    }
    processor::clear_pending(store, chat_id)?;
    Ok(TextOutcome::ReceiptRecorded(drafts))
}

async fn record_text(
    store: &dyn LedgerStore,
    oracle: &dyn ExtractionOracle,
    chat_id: &str,
    text: &str,
    sender: &Participant,
) -> Result<TextOutcome, ProcessError> {
    let focused = processor::get_focus(store, chat_id)?;
    let extraction = oracle::extract_transactions(oracle, text, sender.display_name()).await;

    if !extraction.is_transaction {
        // Plain chatter is ignored while a session is focused
        return match focused {
            Some(_) => Ok(TextOutcome::Ignored),
            None => Ok(TextOutcome::SessionStarted(processor::create_session(
                store, chat_id, text, sender,
            )?)),
        };
    }

    let session = match focused {
        Some(session) if session.is_active() => session,
        _ => return Ok(TextOutcome::NoActiveSession),
    };
    let drafts = match drafts_from_extraction(&extraction.transactions, sender) {
        Some(drafts) if !drafts.is_empty() => drafts,
        _ => return Ok(TextOutcome::Unclear),
    };

    processor::add_transactions(store, &session.id, &drafts)?;
    Ok(TextOutcome::TransactionsRecorded(drafts))
}

/* Drafts */

// None when any payer or consumer cannot be named.
pub fn drafts_from_extraction(
    transactions: &[ExtractedTransaction],
    sender: &Participant,
) -> Option<Vec<TransactionDraft>> {
    transactions
        .iter()
        .map(|transaction| {
            Some(TransactionDraft {
                payer: normalize_participant(&transaction.payer, sender)?,
                consumer: normalize_participant(&transaction.consumer, sender)?,
                amount: transaction.amount,
                description: transaction.description.clone(),
            })
        })
        .collect()
}

// One draft per allocated item, all paid by the receipt's payer.
pub fn drafts_from_allocations(
    allocations: &[ItemAllocation],
    payer: &Participant,
    sender: &Participant,
) -> Option<Vec<TransactionDraft>> {
    allocations
        .iter()
        .map(|allocation| {
            Some(TransactionDraft {
                payer: payer.clone(),
                consumer: normalize_participant(&allocation.consumer, sender)?,
                amount: allocation.price,
                description: allocation.item_name.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{
        models::SessionStatus,
        oracle::{testing::StubOracle, ReceiptItem, TextExtraction},
        store::MemoryStore,
    };

    fn sender() -> Participant {
        Participant::Platform {
            user_id: 42,
            display_name: "rio".to_string(),
        }
    }

    fn free_text(name: &str) -> Participant {
        Participant::FreeText {
            display_name: name.to_string(),
        }
    }

    fn receipt() -> ReceiptScan {
        ReceiptScan {
            success: true,
            store: Some("Warung Sate".to_string()),
            total_amount: 55000,
            items: vec![
                ReceiptItem {
                    name: "Sate".to_string(),
                    quantity: 1,
                    price: 30000,
                },
                ReceiptItem {
                    name: "Bakso".to_string(),
                    quantity: 1,
                    price: 25000,
                },
            ],
        }
    }

    fn allocations() -> Vec<ItemAllocation> {
        vec![
            ItemAllocation {
                consumer: "gua".to_string(),
                item_name: "Sate".to_string(),
                price: 30000,
            },
            ItemAllocation {
                consumer: "Budi".to_string(),
                item_name: "Bakso".to_string(),
                price: 25000,
            },
        ]
    }

    fn extraction(payer: &str, consumer: &str, amount: i64) -> TextExtraction {
        TextExtraction {
            is_transaction: true,
            transactions: vec![ExtractedTransaction {
                payer: payer.to_string(),
                consumer: consumer.to_string(),
                amount,
                description: "parkir".to_string(),
            }],
        }
    }

    // A chat with a focused session and a receipt waiting for its payer.
    fn chat_with_receipt(store: &MemoryStore) -> Session {
        let session = processor::create_session(store, "chat", "Makan", &sender()).unwrap();
        let action = PendingAction::OcrConfirmation {
            session_id: session.id.clone(),
            receipt: receipt(),
        };
        processor::set_pending(store, "chat", &action).unwrap();
        session
    }

    #[tokio::test]
    async fn test_receipt_flow_records_allocations() {
        let store = MemoryStore::new();
        let session = chat_with_receipt(&store);
        let oracle = StubOracle {
            allocations: Some(allocations()),
            ..StubOracle::default()
        };

        let outcome = handle_text(&store, &oracle, "chat", "@Cindy", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::PayerConfirmed(free_text("Cindy")));
        assert_eq!(
            processor::get_pending(&store, "chat").unwrap(),
            Some(PendingAction::OcrAllocation {
                session_id: session.id.clone(),
                receipt: receipt(),
                payer: free_text("Cindy"),
            })
        );

        let outcome = handle_text(&store, &oracle, "chat", "gua sate, budi bakso", &sender())
            .await
            .unwrap();
        match outcome {
            TextOutcome::ReceiptRecorded(drafts) => {
                assert_eq!(drafts.len(), 2);
                assert!(drafts.iter().all(|draft| draft.payer == free_text("Cindy")));
                assert_eq!(drafts[0].consumer, sender());
                assert_eq!(drafts[1].consumer, free_text("Budi"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(processor::get_pending(&store, "chat").unwrap(), None);
        assert_eq!(store.list_transactions(&session.id).unwrap().len(), 2);
        assert_eq!(
            *oracle.seen.lock().unwrap(),
            vec!["gua sate, budi bakso".to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_payer_is_asked_again() {
        let store = MemoryStore::new();
        let session = chat_with_receipt(&store);
        let oracle = StubOracle::default();

        let outcome = handle_text(&store, &oracle, "chat", "@", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::PayerUnclear);
        assert!(matches!(
            processor::get_pending(&store, "chat").unwrap(),
            Some(PendingAction::OcrConfirmation { .. })
        ));
        assert_eq!(store.list_members(&session.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_allocation_clears_receipt() {
        let store = MemoryStore::new();
        let session = chat_with_receipt(&store);
        let oracle = StubOracle::default();

        handle_text(&store, &oracle, "chat", "me", &sender())
            .await
            .unwrap();
        let outcome = handle_text(&store, &oracle, "chat", "no idea", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::AllocationFailed);
        assert_eq!(processor::get_pending(&store, "chat").unwrap(), None);
        assert!(store.list_transactions(&session.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receipt_for_ended_session_is_dropped() {
        let store = MemoryStore::new();
        let session = chat_with_receipt(&store);
        let oracle = StubOracle {
            allocations: Some(allocations()),
            extraction: Some(TextExtraction::default()),
            ..StubOracle::default()
        };

        // Payer confirmed, then the session ends before the breakdown arrives
        handle_text(&store, &oracle, "chat", "me", &sender())
            .await
            .unwrap();
        processor::end_session(&store, "chat", &session.id).unwrap();

        let outcome = handle_text(&store, &oracle, "chat", "gua sate", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::ReceiptAbandoned("Makan".to_string()));
        assert_eq!(processor::get_pending(&store, "chat").unwrap(), None);
        assert!(oracle.seen.lock().unwrap().is_empty());
        assert_eq!(
            processor::get_session(&store, &session.id).unwrap().status,
            SessionStatus::Ended
        );

        // The next message is handled normally again
        let outcome = handle_text(&store, &oracle, "chat", "Trip Bali", &sender())
            .await
            .unwrap();
        assert!(matches!(outcome, TextOutcome::SessionStarted(ref s) if s.name == "Trip Bali"));
    }

    #[tokio::test]
    async fn test_payer_for_ended_session_is_dropped() {
        let store = MemoryStore::new();
        let session = chat_with_receipt(&store);
        processor::end_session(&store, "chat", &session.id).unwrap();

        let outcome = handle_text(&store, &StubOracle::default(), "chat", "me", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::ReceiptAbandoned("Makan".to_string()));
        assert_eq!(processor::get_pending(&store, "chat").unwrap(), None);
    }

    #[tokio::test]
    async fn test_chatter_without_focus_starts_session() {
        let store = MemoryStore::new();
        let oracle = StubOracle {
            extraction: Some(TextExtraction::default()),
            ..StubOracle::default()
        };

        let outcome = handle_text(&store, &oracle, "chat", "Makan Malam", &sender())
            .await
            .unwrap();
        let session = match outcome {
            TextOutcome::SessionStarted(session) => session,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(session.name, "Makan Malam");
        assert_eq!(
            processor::get_focus(&store, "chat").unwrap().map(|s| s.id),
            Some(session.id)
        );

        let outcome = handle_text(&store, &oracle, "chat", "thanks all", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::Ignored);
        assert_eq!(processor::list_sessions(&store, "chat").unwrap().len(), 1);
        assert_eq!(
            *oracle.seen.lock().unwrap(),
            vec!["Makan Malam".to_string(), "thanks all".to_string()]
        );
    }

    #[tokio::test]
    async fn test_transaction_needs_active_session() {
        let store = MemoryStore::new();
        let oracle = StubOracle {
            extraction: Some(extraction("gua", "Budi", 5000)),
            ..StubOracle::default()
        };

        let outcome = handle_text(&store, &oracle, "chat", "gua bayarin budi 5k", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::NoActiveSession);
        assert!(processor::list_sessions(&store, "chat").unwrap().is_empty());

        let session = processor::create_session(&store, "chat", "Trip", &sender()).unwrap();
        processor::end_session(&store, "chat", &session.id).unwrap();
        processor::set_focus(&store, "chat", &session.id).unwrap();
        let outcome = handle_text(&store, &oracle, "chat", "gua bayarin budi 5k", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::NoActiveSession);
        assert!(store.list_transactions(&session.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transactions_recorded_in_focused_session() {
        let store = MemoryStore::new();
        let session = processor::create_session(&store, "chat", "Trip", &sender()).unwrap();
        let oracle = StubOracle {
            extraction: Some(extraction("gua", "@Budi", 5000)),
            ..StubOracle::default()
        };

        let outcome = handle_text(&store, &oracle, "chat", "gua bayarin budi 5k", &sender())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TextOutcome::TransactionsRecorded(vec![TransactionDraft {
                payer: sender(),
                consumer: free_text("Budi"),
                amount: 5000,
                description: "parkir".to_string(),
            }])
        );
        assert_eq!(store.list_transactions(&session.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unnamed_consumer_is_unclear() {
        let store = MemoryStore::new();
        let session = processor::create_session(&store, "chat", "Trip", &sender()).unwrap();
        let oracle = StubOracle {
            extraction: Some(extraction("gua", "@", 5000)),
            ..StubOracle::default()
        };

        let outcome = handle_text(&store, &oracle, "chat", "gua bayarin 5k", &sender())
            .await
            .unwrap();
        assert_eq!(outcome, TextOutcome::Unclear);
        assert!(store.list_transactions(&session.id).unwrap().is_empty());
    }

    #[test]
    fn test_drafts_from_extraction() {
        let transactions = vec![ExtractedTransaction {
            payer: "@Cindy".to_string(),
            consumer: "rio".to_string(),
            amount: 20000,
            description: "parkir".to_string(),
        }];

        let drafts = drafts_from_extraction(&transactions, &sender()).unwrap();
        assert_eq!(drafts[0].payer, free_text("Cindy"));
        assert_eq!(drafts[0].consumer, sender());
        assert_eq!(drafts[0].amount, 20000);
    }
}
