use std::sync::Arc;

use teloxide::{DownloadError, RequestError};

use crate::bot::{oracle::ExtractionOracle, processor::ProcessError, store::LedgerStore};

/* Types */
pub type HandlerResult = Result<(), BotError>;
pub type Store = Arc<dyn LedgerStore>;
pub type Oracle = Arc<dyn ExtractionOracle>;

#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error("{0}")]
    UserError(String),
    #[error("Process error: {0}")]
    ProcessError(ProcessError),
    #[error("Request error: {0}")]
    RequestError(RequestError),
    #[error("Download error: {0}")]
    DownloadError(DownloadError),
    #[error("Report error: {0}")]
    ReportError(csv::Error),
}

impl From<RequestError> for BotError {
    fn from(request_error: RequestError) -> BotError {
        BotError::RequestError(request_error)
    }
}

impl From<DownloadError> for BotError {
    fn from(download_error: DownloadError) -> BotError {
        BotError::DownloadError(download_error)
    }
}

impl From<ProcessError> for BotError {
    fn from(process_error: ProcessError) -> BotError {
        BotError::ProcessError(process_error)
    }
}

impl From<csv::Error> for BotError {
    fn from(report_error: csv::Error) -> BotError {
        BotError::ReportError(report_error)
    }
}

pub mod bot_actions;
pub mod format;
pub mod identity;
pub mod report;
pub mod time;
