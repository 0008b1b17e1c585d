use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    prelude::*,
    utils::command::BotCommands,
};

use super::{
    config::BotConfig,
    handlers::{
        action_callback, action_cancel, action_end, action_export, action_help, action_list,
        action_new_session, action_photo, action_sessions, action_settlement, action_split,
        action_start, action_text, invalid_state,
    },
    utils::{BotError, Oracle, Store},
};

/* Commands */
#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "Here are the commands I understand:"
)]
pub enum Command {
    #[command(description = "Say hello and get started")]
    Start,
    #[command(description = "Show this list of commands")]
    Help,
    #[command(description = "Start a new session, e.g. /new Dinner at the Cafe")]
    New(String),
    #[command(description = "Pick, reopen or export a session")]
    Sessions,
    #[command(description = "List the transactions of the selected session")]
    List,
    #[command(description = "Show who paid what in the selected session")]
    Split,
    #[command(description = "Show who owes whom in the selected session")]
    Settlement,
    #[command(description = "End the selected session")]
    End,
    #[command(description = "Export the selected session as a CSV report")]
    Export,
    #[command(description = "Cancel the receipt being processed")]
    Cancel,
}

/* Main Dispatch function */
pub async fn run_dispatcher(bot: Bot, store: Store, oracle: Oracle, config: BotConfig) {
    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("Unable to register bot commands: {}", err);
    }

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![store, oracle, config])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

pub fn schema() -> UpdateHandler<BotError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(action_start))
        .branch(case![Command::Help].endpoint(action_help))
        .branch(case![Command::New(name)].endpoint(action_new_session))
        .branch(case![Command::Sessions].endpoint(action_sessions))
        .branch(case![Command::List].endpoint(action_list))
        .branch(case![Command::Split].endpoint(action_split))
        .branch(case![Command::Settlement].endpoint(action_settlement))
        .branch(case![Command::End].endpoint(action_end))
        .branch(case![Command::Export].endpoint(action_export))
        .branch(case![Command::Cancel].endpoint(action_cancel));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(Message::filter_photo().endpoint(action_photo))
        .branch(Message::filter_text().endpoint(action_text))
        .branch(dptree::endpoint(invalid_state));

    let callback_query_handler = Update::filter_callback_query().endpoint(action_callback);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_query_handler)
}
