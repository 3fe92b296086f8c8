use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("not a ticket list page: {0}")]
    Page(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("extraction error: {0}")]
    Extraction(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("analysis error: {0}")]
    Analysis(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
