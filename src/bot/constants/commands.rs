// Commands
pub const COMMAND_START: &str = "/start";
pub const COMMAND_HELP: &str = "/help";
pub const COMMAND_NEW_SESSION: &str = "/new";
pub const COMMAND_SESSIONS: &str = "/sessions";
pub const COMMAND_LIST: &str = "/list";
pub const COMMAND_SPLIT: &str = "/split";
pub const COMMAND_SETTLEMENT: &str = "/settlement";
pub const COMMAND_END: &str = "/end";
pub const COMMAND_EXPORT: &str = "/export";
pub const COMMAND_CANCEL: &str = "/cancel";

pub const VALID_COMMANDS: [&str; 10] = [
    COMMAND_START,
    COMMAND_HELP,
    COMMAND_NEW_SESSION,
    COMMAND_SESSIONS,
    COMMAND_LIST,
    COMMAND_SPLIT,
    COMMAND_SETTLEMENT,
    COMMAND_END,
    COMMAND_EXPORT,
    COMMAND_CANCEL,
];

// Callback data
pub const CALLBACK_SELECT_SESSION: &str = "select_session";
pub const CALLBACK_REOPEN_SESSION: &str = "reopen_session";
pub const CALLBACK_EXPORT_SESSION: &str = "export_session";
pub const CALLBACK_DELETE_TRANSACTION: &str = "delete_tx";
pub const CALLBACK_LIST_PAGE: &str = "list_page";
pub const CALLBACK_SHOW_SPLIT: &str = "show_split";
pub const CALLBACK_SHOW_SETTLEMENT: &str = "show_settlement";
pub const CALLBACK_SHOW_EXPORT: &str = "show_export";
