use std::{process, sync::Arc};

use patungan::bot::{
    run_dispatcher, BotConfig, ExtractionOracle, GeminiOracle, LedgerBackend, LedgerStore,
    MemoryStore, RedisStore,
};

#[tokio::main]
pub async fn main() {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            process::exit(1);
        }
    };

    let store: Arc<dyn LedgerStore> = match config.backend {
        LedgerBackend::Redis => match RedisStore::open(&config.redis_url) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                log::error!("Unable to open redis at {}: {}", config.redis_url, err);
                process::exit(1);
            }
        },
        LedgerBackend::Memory => {
            log::warn!("Using the in-memory ledger, nothing will survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let oracle: Arc<dyn ExtractionOracle> =
        match GeminiOracle::new(&config.gemini_api_key, &config.gemini_model) {
            Ok(oracle) => Arc::new(oracle),
            Err(err) => {
                log::error!("Unable to build the extraction oracle: {}", err);
                process::exit(1);
            }
        };

    log::info!("Starting bot with {:?} ledger", config.backend);
    let bot = teloxide::Bot::from_env();

    run_dispatcher(bot, store, oracle, config).await;
}
