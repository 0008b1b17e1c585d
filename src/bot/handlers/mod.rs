pub use self::callback::action_callback;
pub use self::general::{action_cancel, action_help, action_start, invalid_state};
pub use self::message::{action_photo, action_text};
pub use self::session::{action_end, action_new_session, action_sessions};
pub use self::settlement::{action_export, action_settlement, action_split};
pub use self::transactions::action_list;

mod callback;
mod general;
mod message;
mod session;
mod settlement;
mod transactions;
