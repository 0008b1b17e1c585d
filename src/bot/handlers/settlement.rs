use teloxide::{prelude::*, types::InputFile};

use crate::bot::{
    config::BotConfig,
    constants::messages::{
        ALL_SETTLED_MESSAGE, NOTHING_TO_CALCULATE_MESSAGE, NO_DATA_MESSAGE,
        PREPARING_REPORT_MESSAGE, SINGLE_MEMBER_MESSAGE,
    },
    models::Session,
    processor,
    utils::{
        bot_actions::{get_focused_session, reply_process_error, send_bot_message, send_or_edit},
        format::{
            display_plan, display_summary, make_keyboard_show_export,
            make_keyboard_show_settlement,
        },
        report::{build_report, report_file_name},
        HandlerResult, Oracle, Store,
    },
};

/* Split command.
 * Shows the total spent in the focused session and who paid what.
 */
pub async fn action_split(bot: Bot, msg: Message, store: Store, oracle: Oracle) -> HandlerResult {
    show_split(&bot, &msg, &store, &oracle).await
}

pub async fn show_split(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    oracle: &Oracle,
) -> HandlerResult {
    let session = match get_focused_session(bot, msg, store, oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };
    let settlement = match processor::calculate_settlement(store.as_ref(), &session.id) {
        Ok(settlement) => settlement,
        Err(err) => return reply_process_error(bot, msg, err).await,
    };

    match settlement.summary {
        Some(summary) if summary.total_expenses > 0 => {
            send_or_edit(
                bot,
                msg,
                display_summary(&session.name, &summary),
                Some(make_keyboard_show_settlement()),
                false,
            )
            .await
        }
        _ => send_or_edit(bot, msg, NOTHING_TO_CALCULATE_MESSAGE.to_string(), None, false).await,
    }
}

/* Settlement command.
 * Shows the payments that settle every debt of the focused session.
 */
pub async fn action_settlement(
    bot: Bot,
    msg: Message,
    store: Store,
    oracle: Oracle,
) -> HandlerResult {
    show_settlement(&bot, &msg, &store, &oracle).await
}

pub async fn show_settlement(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    oracle: &Oracle,
) -> HandlerResult {
    let session = match get_focused_session(bot, msg, store, oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };
    let settlement = match processor::calculate_settlement(store.as_ref(), &session.id) {
        Ok(settlement) => settlement,
        Err(err) => return reply_process_error(bot, msg, err).await,
    };

    let summary = match settlement.summary {
        Some(summary) => summary,
        None => return send_or_edit(bot, msg, NO_DATA_MESSAGE.to_string(), None, false).await,
    };
    if summary.member_count <= 1 && summary.total_expenses > 0 {
        return send_or_edit(bot, msg, SINGLE_MEMBER_MESSAGE.to_string(), None, false).await;
    }
    if settlement.plan.is_empty() {
        return send_or_edit(bot, msg, ALL_SETTLED_MESSAGE.to_string(), None, false).await;
    }

    send_or_edit(
        bot,
        msg,
        display_plan(&settlement.plan),
        Some(make_keyboard_show_export()),
        false,
    )
    .await
}

/* Export command.
 * Sends the focused session's report as a CSV document.
 */
pub async fn action_export(
    bot: Bot,
    msg: Message,
    store: Store,
    oracle: Oracle,
    config: BotConfig,
) -> HandlerResult {
    send_focused_report(&bot, &msg, &store, &oracle, &config).await
}

pub async fn send_focused_report(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    oracle: &Oracle,
    config: &BotConfig,
) -> HandlerResult {
    let session = match get_focused_session(bot, msg, store, oracle).await? {
        Some(session) => session,
        None => return Ok(()),
    };
    send_report(bot, msg, store, config, &session).await
}

// Exports any session of the chat by id, ended ones included.
pub async fn action_export_session(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    config: &BotConfig,
    session_id: &str,
) -> HandlerResult {
    match processor::get_session(store.as_ref(), session_id) {
        Ok(session) => send_report(bot, msg, store, config, &session).await,
        Err(err) => reply_process_error(bot, msg, err).await,
    }
}

async fn send_report(
    bot: &Bot,
    msg: &Message,
    store: &Store,
    config: &BotConfig,
    session: &Session,
) -> HandlerResult {
    send_bot_message(bot, msg, PREPARING_REPORT_MESSAGE.to_string()).await?;

    let rows = match processor::list_transaction_rows(store.as_ref(), &session.id) {
        Ok(rows) => rows,
        Err(err) => return reply_process_error(bot, msg, err).await,
    };
    let settlement = match processor::calculate_settlement(store.as_ref(), &session.id) {
        Ok(settlement) => settlement,
        Err(err) => return reply_process_error(bot, msg, err).await,
    };

    let report = build_report(session, &rows, &settlement, config.time_zone)?;
    let document = InputFile::memory(report).file_name(report_file_name(session));

    let request = bot.send_document(msg.chat.id, document);
    match msg.thread_id {
        Some(thread_id) => request.message_thread_id(thread_id).await?,
        None => request.await?,
    };

    log::info!(
        "Exported report for session {} in chat {}",
        session.id,
        msg.chat.id
    );
    Ok(())
}
