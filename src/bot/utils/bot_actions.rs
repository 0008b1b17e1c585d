/* Common utilites for handlers. */

use teloxide::{
    payloads::SendMessage,
    prelude::*,
    requests::JsonRequest,
    types::{InlineKeyboardMarkup, Message},
    Bot,
};

use crate::bot::{
    constants::messages::{NOT_FOUND_MESSAGE, NO_FOCUS_MESSAGE, UNKNOWN_ERROR_MESSAGE},
    models::Session,
    oracle,
    processor::{self, ProcessError},
};

use super::{HandlerResult, Oracle, Store};

// Wrapper function to send bot message to specific thread, if available
// Only replaces bot::send_message, as bot::edit_message_text edits specific msg ID
pub fn send_bot_message(bot: &Bot, msg: &Message, text: String) -> JsonRequest<SendMessage> {
    let thread_id = msg.thread_id;
    match thread_id {
        Some(thread_id) => bot
            .send_message(msg.chat.id, text)
            .message_thread_id(thread_id),
        None => bot.send_message(msg.chat.id, text),
    }
}

// Sends a new message, or edits the given one when answering a button press.
pub async fn send_or_edit(
    bot: &Bot,
    msg: &Message,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
    edit: bool,
) -> HandlerResult {
    if edit {
        let request = bot.edit_message_text(msg.chat.id, msg.id, text);
        match keyboard {
            Some(keyboard) => request.reply_markup(keyboard).await?,
            None => request.await?,
        };
    } else {
        let request = send_bot_message(bot, msg, text);
        match keyboard {
            Some(keyboard) => request.reply_markup(keyboard).await?,
            None => request.await?,
        };
    }
    Ok(())
}

// Sends a system message after letting the oracle reword it.
pub async fn send_rephrased(
    bot: &Bot,
    msg: &Message,
    oracle: &Oracle,
    text: &str,
) -> HandlerResult {
    let text = oracle::rephrase(oracle.as_ref(), text).await;
    send_bot_message(bot, msg, text).await?;
    Ok(())
}

// Converts a process error into a reply. Store failures are logged for operators.
pub async fn reply_process_error(bot: &Bot, msg: &Message, err: ProcessError) -> HandlerResult {
    let text = match err {
        ProcessError::NotFound(what) => {
            log::warn!("Chat {}: {} not found", msg.chat.id, what);
            NOT_FOUND_MESSAGE.to_string()
        }
        ProcessError::InvalidInput(text) => format!("Uh-oh! ❌ {text}"),
        ProcessError::SessionEnded(name) => {
            format!("Session \"{name}\" has already ended. Reopen it from /sessions first!")
        }
        ProcessError::StoreFailure(err) => {
            log::error!("Chat {}: store failure: {}", msg.chat.id, err);
            UNKNOWN_ERROR_MESSAGE.to_string()
        }
    };
    send_bot_message(bot, msg, text).await?;
    Ok(())
}

// Resolves the chat's focused session, telling the user when there is none.
pub async fn get_focused_session(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    oracle: &Oracle,
) -> Result<Option<Session>, super::BotError> {
    match processor::get_focus(store.as_ref(), &msg.chat.id.to_string()) {
        Ok(Some(session)) => Ok(Some(session)),
        Ok(None) => {
            send_rephrased(bot, msg, oracle, NO_FOCUS_MESSAGE).await?;
            Ok(None)
        }
        Err(err) => {
            reply_process_error(bot, msg, err).await?;
            Ok(None)
        }
    }
}
