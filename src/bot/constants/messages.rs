// Error messages
pub const UNKNOWN_ERROR_MESSAGE: &str =
    "Oops! Something went wrong! I can't do that right now. Please try again later!";
pub const NOT_FOUND_MESSAGE: &str =
    "Uh-oh! 🔍 I couldn't find that anymore. It may have been removed already.";
pub const NO_FOCUS_MESSAGE: &str = "No session is selected. Use /sessions to pick one.";
pub const NO_ACTIVE_SESSION_MESSAGE: &str =
    "That looks like a transaction, but there is no active session yet. Create a session first.";
pub const CONFUSED_MESSAGE: &str =
    "Hmm, I got a bit confused there. Could you say that again more clearly?";
pub const PHOTO_ERROR_MESSAGE: &str = "Sorry, something went wrong while reading that photo.";

// Instruction messages
pub const WELCOME_MESSAGE: &str =
    "Welcome! Type a session name to get started, or use /sessions to see existing sessions.";
pub const GREETING_MESSAGE: &str = "Hello everyone! 👋 I'm Patungan, here to help you split bills without the headache.\n\nJust type a session name to start, for example: Dinner Together";
pub const SESSION_NAME_INSTRUCTIONS_MESSAGE: &str =
    "Please give the session a name. For example: /new Dinner at the Cafe";
pub const HELP_FOOTER_MESSAGE: &str = "To record a transaction, just type it (for example: I paid 5k for parking) or send a photo of the receipt.";
pub const ASK_PAYER_MESSAGE: &str = "Who paid for this receipt? (Type a name or 'me')";
pub const ASK_ALLOCATION_MESSAGE: &str = "Now tell me who had what. (For example: 'me satay, rio meatballs, the rest is shared')";

// Status messages
pub const SESSION_LIST_MESSAGE: &str = "Pick a session to manage:";
pub const NO_SESSIONS_MESSAGE: &str = "No sessions have been created in this chat yet.";
pub const NO_TRANSACTIONS_MESSAGE: &str = "There are no transactions in this session yet.";
pub const NOTHING_TO_CALCULATE_MESSAGE: &str = "There are no transactions to calculate yet.";
pub const NO_DATA_MESSAGE: &str = "There is no data to calculate.";
pub const SINGLE_MEMBER_MESSAGE: &str = "There is only one member, so nothing needs settling.";
pub const ALL_SETTLED_MESSAGE: &str = "Everything is settled, or there are no transactions yet!";
pub const READING_RECEIPT_MESSAGE: &str = "Got the receipt. Let me read it first...";
pub const UNREADABLE_RECEIPT_MESSAGE: &str =
    "I couldn't read that receipt. Try a clearer photo, please.";
pub const RECEIPT_RECORDED_MESSAGE: &str =
    "Alright, every item on the receipt has been allocated and recorded.";
pub const ALLOCATION_FAILED_MESSAGE: &str =
    "I couldn't work out who had what, so I've cancelled this receipt. Please send it again.";
pub const TRANSACTION_DELETED_MESSAGE: &str = "Transaction deleted!";
pub const PREPARING_REPORT_MESSAGE: &str = "Preparing the report...";

// Action messages
pub const BLANK_CANCEL: &str = "There's nothing to cancel right now! 🌟";
pub const CANCEL_RECEIPT_MESSAGE: &str =
    "Okay! I've cancelled the receipt. No changes have been made! 🌟";
