pub use self::config::{BotConfig, ConfigError, LedgerBackend};
pub use self::dispatcher::{run_dispatcher, Command};
pub use self::oracle::{ExtractionOracle, GeminiOracle};
pub use self::store::{LedgerStore, MemoryStore, RedisStore};

mod config;
mod constants;
mod conversation;
mod dispatcher;
mod handlers;
mod models;
mod optimizer;
mod oracle;
mod processor;
mod store;
mod utils;
