pub mod cli;
pub mod error;
pub mod format;
pub mod privacy;
pub mod session;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
pub use privacy::{
    add_noise, enforce_k_anonymity, enforce_l_diversity, LDiversityMode, PrivacyPolicy,
};
pub use session::Session;
pub use sql::executor::{execute_create, execute_insert, execute_select, StatementOutcome};
pub use sql::lexer::tokenize;
pub use sql::parser::parse;
pub use storage::table::{Column, DataType, Row, Schema, Table, Value};
pub use storage::Catalog;
