use teloxide::{prelude::*, utils::command::BotCommands};

use crate::bot::{
    constants::{
        commands::VALID_COMMANDS,
        messages::{
            BLANK_CANCEL, CANCEL_RECEIPT_MESSAGE, GREETING_MESSAGE, HELP_FOOTER_MESSAGE,
            WELCOME_MESSAGE,
        },
        misc::MAX_COMMAND_DISTANCE,
    },
    dispatcher::Command,
    processor,
    utils::{
        bot_actions::{reply_process_error, send_bot_message, send_rephrased},
        HandlerResult, Oracle, Store,
    },
};

/* Invalid state.
 * Invoked for messages that are neither commands, text nor photos.
 * Only reacts when the bot itself is added to a group, to reduce spam.
 */
pub async fn invalid_state(bot: Bot, msg: Message) -> HandlerResult {
    // Check if the message is SPECIFICALLY about the bot itself being added to a group
    if let Some(new_members) = msg.new_chat_members() {
        let bot_id = bot.get_me().await?.id;
        if new_members.iter().any(|member| member.id == bot_id) {
            send_bot_message(&bot, &msg, GREETING_MESSAGE.to_string()).await?;
        }
    }
    Ok(())
}

/* Start command.
 * Displays a welcome message to the user.
 */
pub async fn action_start(bot: Bot, msg: Message, oracle: Oracle) -> HandlerResult {
    send_rephrased(&bot, &msg, &oracle, WELCOME_MESSAGE).await
}

/* Help command.
 * Displays a list of commands available to the user.
 */
pub async fn action_help(bot: Bot, msg: Message) -> HandlerResult {
    let commands = Command::descriptions().to_string();
    send_bot_message(
        &bot,
        &msg,
        format!("{commands}\n\n{HELP_FOOTER_MESSAGE}"),
    )
    .await?;
    Ok(())
}

/* Cancel command.
 * Abandons a receipt that is waiting for a payer or a breakdown.
 */
pub async fn action_cancel(bot: Bot, msg: Message, store: Store) -> HandlerResult {
    let chat_id = msg.chat.id.to_string();
    let pending = match processor::get_pending(store.as_ref(), &chat_id) {
        Ok(pending) => pending,
        Err(err) => return reply_process_error(&bot, &msg, err).await,
    };

    if pending.is_none() {
        send_bot_message(&bot, &msg, BLANK_CANCEL.to_string()).await?;
        return Ok(());
    }

    match processor::clear_pending(store.as_ref(), &chat_id) {
        Ok(()) => {
            send_bot_message(&bot, &msg, CANCEL_RECEIPT_MESSAGE.to_string()).await?;
            Ok(())
        }
        Err(err) => reply_process_error(&bot, &msg, err).await,
    }
}

// Finds the valid command closest to a mistyped one, if any is close enough.
pub fn suggest_command(command: &str) -> Option<&'static str> {
    let command = command
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_start_matches('/');
    let command = command.split('@').next().unwrap_or_default();

    let mut closest = None;
    let mut min_distance = MAX_COMMAND_DISTANCE;
    for valid in VALID_COMMANDS {
        let distance = strsim::levenshtein(command, valid.trim_start_matches('/'));
        if distance < min_distance {
            min_distance = distance;
            closest = Some(valid);
        }
    }
    closest
}

/* Unknown command.
 * Suggests the closest valid command, or points to help.
 */
pub async fn action_unknown_command(bot: Bot, msg: Message, text: &str) -> HandlerResult {
    let reply = match suggest_command(text) {
        Some(command) => format!("Unknown command. Did you mean {command}?"),
        None => "Unknown command. Type /help to see the list of commands.".to_string(),
    };
    send_bot_message(&bot, &msg, reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_command() {
        assert_eq!(suggest_command("/setlement"), Some("/settlement"));
        assert_eq!(suggest_command("/sesions now"), Some("/sessions"));
        assert_eq!(suggest_command("/lst@patungan_bot"), Some("/list"));
        assert_eq!(suggest_command("/helo"), Some("/help"));
        assert_eq!(suggest_command("/xyzzyplugh"), None);
    }
}
