use thiserror::Error;

use crate::privacy::PrivacyError;
use crate::sql::executor::ExecutionError;
use crate::sql::parser::ParseError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Execution(#[from] ExecutionError),

    #[error("Privacy configuration error: {0}")]
    Privacy(#[from] PrivacyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
