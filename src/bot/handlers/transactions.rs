use teloxide::prelude::*;

use crate::bot::{
    constants::messages::{NO_TRANSACTIONS_MESSAGE, TRANSACTION_DELETED_MESSAGE},
    models::Session,
    processor,
    utils::{
        bot_actions::{get_focused_session, reply_process_error, send_bot_message, send_or_edit},
        format::{display_transaction_page, make_keyboard_show_split, make_keyboard_transactions},
        HandlerResult, Oracle, Store,
    },
};

/* List command.
 * Shows the first page of the focused session's transactions.
 */
pub async fn action_list(bot: Bot, msg: Message, store: Store, oracle: Oracle) -> HandlerResult {
    let session = match get_focused_session(&bot, &msg, &store, &oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };
    show_page(&bot, &msg, &store, &session, 1, false).await
}

/* List page.
 * Re-renders the list message at the requested page.
 */
pub async fn action_list_page(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    oracle: &Oracle,
    page: usize,
) -> HandlerResult {
    let session = match get_focused_session(bot, msg, store, oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };
    show_page(bot, msg, store, &session, page, true).await
}

/* Delete transaction.
 * Removes one transaction, then re-renders the page it was deleted from.
 */
pub async fn action_delete_transaction(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    oracle: &Oracle,
    transaction_id: &str,
    page: usize,
) -> HandlerResult {
    let session = match get_focused_session(bot, msg, store, oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };

    if let Err(err) = processor::delete_transaction(store.as_ref(), &session.id, transaction_id) {
        return reply_process_error(bot, msg, err).await;
    }
    send_bot_message(bot, msg, TRANSACTION_DELETED_MESSAGE.to_string()).await?;
    show_page(bot, msg, store, &session, page, true).await
}

async fn show_page(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    session: &Session,
    page: usize,
    edit: bool,
) -> HandlerResult {
    let page = match processor::list_transactions_page(store.as_ref(), &session.id, page) {
        Ok(page) => page,
        Err(err) => return reply_process_error(bot, msg, err).await,
    };

    if page.total == 0 {
        return send_or_edit(bot, msg, NO_TRANSACTIONS_MESSAGE.to_string(), None, edit).await;
    }

    let mut keyboard = make_keyboard_transactions(&page);
    keyboard
        .inline_keyboard
        .extend(make_keyboard_show_split().inline_keyboard);

    send_or_edit(
        bot,
        msg,
        display_transaction_page(&session.name, &page),
        Some(keyboard),
        edit,
    )
    .await
}
