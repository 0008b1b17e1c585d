// Session
pub const SESSION_KEY: &str = "session";
pub const CHAT_SESSIONS_KEY: &str = "chat_sessions";

// Member
pub const MEMBER_KEY: &str = "session_members";
pub const MEMBER_INDEX_KEY: &str = "session_member_index";

// Transaction
pub const TRANSACTION_KEY: &str = "session_transactions";
pub const TRANSACTION_ORDER_KEY: &str = "session_transaction_order";
pub const TRANSACTION_SEQ_KEY: &str = "session_transaction_seq";

// Chat
pub const CHAT_STATE_KEY: &str = "chat_state";

// Chat State fields
pub const FIELD_FOCUSED_SESSION: &str = "focused_session_id";
pub const FIELD_PENDING_ACTION: &str = "pending_action";
