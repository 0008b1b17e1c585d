use teloxide::prelude::*;

use crate::bot::{
    constants::messages::{
        NO_SESSIONS_MESSAGE, SESSION_LIST_MESSAGE, SESSION_NAME_INSTRUCTIONS_MESSAGE,
    },
    models::Session,
    processor,
    utils::{
        bot_actions::{
            get_focused_session, reply_process_error, send_bot_message, send_or_edit,
            send_rephrased,
        },
        format::{make_keyboard_ended_session, make_keyboard_sessions},
        identity::sender_participant,
        BotError, HandlerResult, Oracle, Store,
    },
};

/* New session command.
 * Creates a session named by the command argument and focuses it.
 */
pub async fn action_new_session(
    bot: Bot,
    msg: Message,
    store: Store,
    oracle: Oracle,
    name: String,
) -> HandlerResult {
    if name.trim().is_empty() {
        send_bot_message(&bot, &msg, SESSION_NAME_INSTRUCTIONS_MESSAGE.to_string()).await?;
        return Ok(());
    }
    start_session(&bot, &msg, &store, &oracle, &name).await
}

// Creates a session founded by the sender of the message.
pub async fn start_session(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    oracle: &Oracle,
    name: &str,
) -> HandlerResult {
    let founder = match msg.from() {
        Some(user) => sender_participant(user),
        None => {
            return Err(BotError::UserError(
                "Unable to create a session: message has no sender".to_string(),
            ))
        }
    };

    let chat_id = msg.chat.id.to_string();
    match processor::create_session(store.as_ref(), &chat_id, name, &founder) {
        Ok(session) => send_rephrased(bot, msg, oracle, &session_started_message(&session)).await,
        Err(err) => reply_process_error(bot, msg, err).await,
    }
}

pub fn session_started_message(session: &Session) -> String {
    format!(
        "Session \"{}\" is ready and selected! Record expenses by typing them, for example: I paid 50k for dinner.",
        session.name
    )
}

/* Sessions command.
 * Lists every session of the chat, newest first, with the focused one marked.
 */
pub async fn action_sessions(bot: Bot, msg: Message, store: Store) -> HandlerResult {
    let chat_id = msg.chat.id.to_string();
    let sessions = match processor::list_sessions(store.as_ref(), &chat_id) {
        Ok(sessions) => sessions,
        Err(err) => return reply_process_error(&bot, &msg, err).await,
    };

    if sessions.is_empty() {
        send_bot_message(&bot, &msg, NO_SESSIONS_MESSAGE.to_string()).await?;
        return Ok(());
    }

    let focused = match processor::get_focus(store.as_ref(), &chat_id) {
        Ok(focused) => focused,
        Err(err) => return reply_process_error(&bot, &msg, err).await,
    };
    let keyboard = make_keyboard_sessions(&sessions, focused.as_ref().map(|s| s.id.as_str()));

    send_bot_message(&bot, &msg, SESSION_LIST_MESSAGE.to_string())
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/* End command.
 * Ends the focused session. The ended session can be reopened or exported.
 */
pub async fn action_end(bot: Bot, msg: Message, store: Store, oracle: Oracle) -> HandlerResult {
    let session = match get_focused_session(&bot, &msg, &store, &oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };

    let chat_id = msg.chat.id.to_string();
    match processor::end_session(store.as_ref(), &chat_id, &session.id) {
        Ok(session) => {
            send_bot_message(
                &bot,
                &msg,
                format!("Session \"{}\" has ended. 🏁", session.name),
            )
            .reply_markup(make_keyboard_ended_session(&session.id))
            .await?;
            Ok(())
        }
        Err(err) => reply_process_error(&bot, &msg, err).await,
    }
}

/* Select session.
 * Active sessions become the focus. Ended ones offer to reopen or export instead.
 */
pub async fn action_select_session(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    session_id: &str,
) -> HandlerResult {
    let session = match processor::get_session(store.as_ref(), session_id) {
        Ok(session) => session,
        Err(err) => return reply_process_error(bot, msg, err).await,
    };

    if !session.is_active() {
        let text = format!(
            "Session \"{}\" has ended. Reopen it, or view its report?",
            session.name
        );
        return send_or_edit(
            bot,
            msg,
            text,
            Some(make_keyboard_ended_session(&session.id)),
            true,
        )
        .await;
    }

    let chat_id = msg.chat.id.to_string();
    match processor::set_focus(store.as_ref(), &chat_id, &session.id) {
        Ok(session) => {
            let text = format!("Session \"{}\" is now selected. ✅", session.name);
            send_or_edit(bot, msg, text, None, true).await
        }
        Err(err) => reply_process_error(bot, msg, err).await,
    }
}

/* Reopen session.
 * Makes an ended session active again and focuses it.
 */
pub async fn action_reopen_session(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    session_id: &str,
) -> HandlerResult {
    let chat_id = msg.chat.id.to_string();
    match processor::reopen_session(store.as_ref(), &chat_id, session_id) {
        Ok(session) => {
            let text = format!(
                "Session \"{}\" is open again and selected. 🔄",
                session.name
            );
            send_or_edit(bot, msg, text, None, true).await
        }
        Err(err) => reply_process_error(bot, msg, err).await,
    }
}
