pub mod catalog;
pub mod error;
pub mod table;

pub use catalog::Catalog;
pub use error::{ConstraintViolation, SchemaError, StorageError};
pub use table::{Column, Constraint, DataType, Row, Schema, Table, Value, HIDDEN_COUNT_COLUMN};
