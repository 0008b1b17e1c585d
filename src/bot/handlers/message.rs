use teloxide::{net::Download, prelude::*, types::ChatAction};

use crate::bot::{
    constants::messages::{
        ALLOCATION_FAILED_MESSAGE, ASK_ALLOCATION_MESSAGE, ASK_PAYER_MESSAGE, CONFUSED_MESSAGE,
        NO_ACTIVE_SESSION_MESSAGE, PHOTO_ERROR_MESSAGE, READING_RECEIPT_MESSAGE,
        RECEIPT_RECORDED_MESSAGE, UNREADABLE_RECEIPT_MESSAGE,
    },
    conversation::{self, TextOutcome},
    models::{PendingAction, TransactionDraft},
    oracle::{self, ReceiptScan},
    processor::{self, ProcessError},
    utils::{
        bot_actions::{
            get_focused_session, reply_process_error, send_bot_message, send_rephrased,
        },
        format::{display_currency_amount, make_keyboard_show_split},
        identity::sender_participant,
        BotError, HandlerResult, Oracle, Store,
    },
};

use super::{general::action_unknown_command, session::session_started_message};

/* Text message.
 * Continues a pending receipt flow, records transactions detected in the text,
 * or starts a session named by the text when nothing is focused.
 */
pub async fn action_text(bot: Bot, msg: Message, store: Store, oracle: Oracle) -> HandlerResult {
    let text = match msg.text() {
        Some(text) => text.trim().to_string(),
        None => return Ok(()),
    };
    if text.starts_with('/') {
        return action_unknown_command(bot, msg, &text).await;
    }

    let sender = match msg.from() {
        Some(user) => sender_participant(user),
        None => return Ok(()),
    };

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;
    let outcome = conversation::handle_text(
        store.as_ref(),
        oracle.as_ref(),
        &msg.chat.id.to_string(),
        &text,
        &sender,
    )
    .await;

    match outcome {
        Ok(TextOutcome::PayerConfirmed(payer)) => {
            let reply = format!(
                "Got it, {} paid. {}",
                payer.display_name(),
                ASK_ALLOCATION_MESSAGE
            );
            send_bot_message(&bot, &msg, reply).await?;
        }
        Ok(TextOutcome::PayerUnclear) => {
            send_bot_message(&bot, &msg, ASK_PAYER_MESSAGE.to_string()).await?;
        }
        Ok(TextOutcome::ReceiptRecorded(_)) => {
            let reply = oracle::rephrase(oracle.as_ref(), RECEIPT_RECORDED_MESSAGE).await;
            send_bot_message(&bot, &msg, reply)
                .reply_markup(make_keyboard_show_split())
                .await?;
        }
        Ok(TextOutcome::AllocationFailed) => {
            send_bot_message(&bot, &msg, ALLOCATION_FAILED_MESSAGE.to_string()).await?;
        }
        Ok(TextOutcome::ReceiptAbandoned(name)) => {
            let reply = format!(
                "Session \"{name}\" is no longer open, so I've dropped the receipt. Nothing was recorded."
            );
            send_bot_message(&bot, &msg, reply).await?;
        }
        Ok(TextOutcome::TransactionsRecorded(drafts)) => {
            let reply = oracle::rephrase(oracle.as_ref(), &recorded_message(&drafts)).await;
            send_bot_message(&bot, &msg, reply)
                .reply_markup(make_keyboard_show_split())
                .await?;
        }
        Ok(TextOutcome::NoActiveSession) => {
            send_rephrased(&bot, &msg, &oracle, NO_ACTIVE_SESSION_MESSAGE).await?;
        }
        Ok(TextOutcome::Unclear) => {
            send_rephrased(&bot, &msg, &oracle, CONFUSED_MESSAGE).await?;
        }
        Ok(TextOutcome::SessionStarted(session)) => {
            send_rephrased(&bot, &msg, &oracle, &session_started_message(&session)).await?;
        }
        Ok(TextOutcome::Ignored) => {}
        Err(err) => return reply_process_error(&bot, &msg, err).await,
    }
    Ok(())
}

/* Photo message.
 * Reads a receipt for the focused session, then asks who paid for it.
 */
pub async fn action_photo(bot: Bot, msg: Message, store: Store, oracle: Oracle) -> HandlerResult {
    let session = match get_focused_session(&bot, &msg, &store, &oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };
    if !session.is_active() {
        return reply_process_error(&bot, &msg, ProcessError::SessionEnded(session.name)).await;
    }

    // Telegram sends several sizes, the largest one last
    let photo = match msg.photo().and_then(|sizes| sizes.last()) {
        Some(photo) => photo.clone(),
        None => return Ok(()),
    };

    send_rephrased(&bot, &msg, &oracle, READING_RECEIPT_MESSAGE).await?;
    bot.send_chat_action(msg.chat.id, ChatAction::UploadPhoto).await?;

    let image = match download_photo(&bot, &photo.file.id).await {
        Ok(image) => image,
        Err(err) => {
            log::error!("Chat {}: unable to download photo: {}", msg.chat.id, err);
            send_bot_message(&bot, &msg, PHOTO_ERROR_MESSAGE.to_string()).await?;
            return Ok(());
        }
    };

    let receipt = oracle::extract_receipt(oracle.as_ref(), &image).await;
    if !receipt.success {
        return send_rephrased(&bot, &msg, &oracle, UNREADABLE_RECEIPT_MESSAGE).await;
    }

    let reply = format!("{}\n\n{}", display_receipt(&receipt), ASK_PAYER_MESSAGE);
    let action = PendingAction::OcrConfirmation {
        session_id: session.id,
        receipt,
    };
    match processor::set_pending(store.as_ref(), &msg.chat.id.to_string(), &action) {
        Ok(()) => {
            send_bot_message(&bot, &msg, reply).await?;
            Ok(())
        }
        Err(err) => reply_process_error(&bot, &msg, err).await,
    }
}

async fn download_photo(bot: &Bot, file_id: &str) -> Result<Vec<u8>, BotError> {
    let file = bot.get_file(file_id).await?;
    let mut image = Vec::new();
    bot.download_file(&file.path, &mut image).await?;
    Ok(image)
}

fn recorded_message(drafts: &[TransactionDraft]) -> String {
    let total: i64 = drafts.iter().map(|draft| draft.amount).sum();
    let descriptions: Vec<&str> = drafts
        .iter()
        .map(|draft| draft.description.as_str())
        .collect();
    format!(
        "Transactions ({}) with a total of {} have been recorded.",
        descriptions.join(", "),
        display_currency_amount(total)
    )
}

fn display_receipt(receipt: &ReceiptScan) -> String {
    let mut message = match &receipt.store {
        Some(store) => format!("🧾 Receipt from {store}\n\n"),
        None => "🧾 Receipt\n\n".to_string(),
    };
    for item in &receipt.items {
        message.push_str(&format!(
            "- {} x{}: {}\n",
            item.name,
            item.quantity,
            display_currency_amount(item.price)
        ));
    }
    message.push_str(&format!(
        "\nTotal: {}",
        display_currency_amount(receipt.total_amount)
    ));
    message
}
