use regex::Regex;
use teloxide::prelude::*;

use crate::bot::{
    config::BotConfig,
    constants::commands::{
        CALLBACK_EXPORT_SESSION, CALLBACK_REOPEN_SESSION, CALLBACK_SELECT_SESSION,
        CALLBACK_SHOW_EXPORT, CALLBACK_SHOW_SETTLEMENT, CALLBACK_SHOW_SPLIT,
    },
    utils::{HandlerResult, Oracle, Store},
};

use super::{
    session::{action_reopen_session, action_select_session},
    settlement::{action_export_session, send_focused_report, show_settlement, show_split},
    transactions::{action_delete_transaction, action_list_page},
};

// Button presses the bot understands, decoded from callback data.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackAction {
    SelectSession(String),
    ReopenSession(String),
    ExportSession(String),
    DeleteTransaction { transaction_id: String, page: usize },
    ListPage(usize),
    ShowSplit,
    ShowSettlement,
    ShowExport,
}

pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    match data {
        CALLBACK_SHOW_SPLIT => return Some(CallbackAction::ShowSplit),
        CALLBACK_SHOW_SETTLEMENT => return Some(CallbackAction::ShowSettlement),
        CALLBACK_SHOW_EXPORT => return Some(CallbackAction::ShowExport),
        _ => {}
    }

    if let Ok(re) = Regex::new(r"^(select_session|reopen_session|export_session):(.+)$") {
        if let Some(captures) = re.captures(data) {
            let session_id = captures[2].to_string();
            return match &captures[1] {
                CALLBACK_SELECT_SESSION => Some(CallbackAction::SelectSession(session_id)),
                CALLBACK_REOPEN_SESSION => Some(CallbackAction::ReopenSession(session_id)),
                CALLBACK_EXPORT_SESSION => Some(CallbackAction::ExportSession(session_id)),
                _ => None,
            };
        }
    }

    if let Ok(re) = Regex::new(r"^delete_tx:([^:]+):(\d+)$") {
        if let Some(captures) = re.captures(data) {
            let page = captures[2].parse::<usize>().ok()?;
            return Some(CallbackAction::DeleteTransaction {
                transaction_id: captures[1].to_string(),
                page,
            });
        }
    }

    if let Ok(re) = Regex::new(r"^list_page:(\d+)$") {
        if let Some(captures) = re.captures(data) {
            return captures[1].parse::<usize>().ok().map(CallbackAction::ListPage);
        }
    }

    None
}

/* Callback query.
 * Routes inline button presses. Session picks and list pages edit the pressed
 * message in place, everything else replies with a new one.
 */
pub async fn action_callback(
    bot: Bot,
    query: CallbackQuery,
    store: Store,
    oracle: Oracle,
    config: BotConfig,
) -> HandlerResult {
    bot.answer_callback_query(query.id.clone()).await?;

    let msg = match query.message {
        Some(msg) => msg,
        None => return Ok(()),
    };
    let action = match query.data.as_deref().and_then(parse_callback) {
        Some(action) => action,
        None => {
            log::warn!(
                "Chat {}: unrecognised callback data {:?}",
                msg.chat.id,
                query.data
            );
            return Ok(());
        }
    };

    match action {
        CallbackAction::SelectSession(session_id) => {
            action_select_session(&bot, &msg, &store, &session_id).await
        }
        CallbackAction::ReopenSession(session_id) => {
            action_reopen_session(&bot, &msg, &store, &session_id).await
        }
        CallbackAction::ExportSession(session_id) => {
            action_export_session(&bot, &msg, &store, &config, &session_id).await
        }
        CallbackAction::DeleteTransaction {
            transaction_id,
            page,
        } => action_delete_transaction(&bot, &msg, &store, &oracle, &transaction_id, page).await,
        CallbackAction::ListPage(page) => {
            action_list_page(&bot, &msg, &store, &oracle, page).await
        }
        CallbackAction::ShowSplit => show_split(&bot, &msg, &store, &oracle).await,
        CallbackAction::ShowSettlement => {
            show_settlement(&bot, &msg, &store, &oracle).await
        }
        CallbackAction::ShowExport => {
            send_focused_report(&bot, &msg, &store, &oracle, &config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback() {
        assert_eq!(parse_callback("show_split"), Some(CallbackAction::ShowSplit));
        assert_eq!(
            parse_callback("show_settlement"),
            Some(CallbackAction::ShowSettlement)
        );
        assert_eq!(
            parse_callback("select_session:abc-123"),
            Some(CallbackAction::SelectSession("abc-123".to_string()))
        );
        assert_eq!(
            parse_callback("export_session:abc-123"),
            Some(CallbackAction::ExportSession("abc-123".to_string()))
        );
        assert_eq!(
            parse_callback("delete_tx:tx-9:2"),
            Some(CallbackAction::DeleteTransaction {
                transaction_id: "tx-9".to_string(),
                page: 2,
            })
        );
        assert_eq!(parse_callback("list_page:3"), Some(CallbackAction::ListPage(3)));
    }

    #[test]
    fn test_parse_callback_rejects_garbage() {
        assert_eq!(parse_callback(""), None);
        assert_eq!(parse_callback("list_page:two"), None);
        assert_eq!(parse_callback("delete_tx:tx-9"), None);
        assert_eq!(parse_callback("select_session:"), None);
        assert_eq!(parse_callback("unknown:1"), None);
    }
}
