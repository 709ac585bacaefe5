use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Duplicate column name '{column}' in table {table}")]
    DuplicateColumnName { table: String, column: String },
    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },
    #[error("Column count mismatch: expected {expected} values, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    #[error("Column {column} cannot be NULL")]
    NotNull { column: String },
    #[error("Column {column} must be unique, value '{value}' already present")]
    Unique { column: String, value: String },
    #[error("Column {column} exceeds VARCHAR({max}) with {actual} characters")]
    VarcharTooLong {
        column: String,
        max: usize,
        actual: usize,
    },
    #[error("Column {column} expects {expected}, got '{value}'")]
    TypeMismatch {
        column: String,
        expected: String,
        value: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),
}
