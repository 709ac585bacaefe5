use std::collections::{HashMap, HashSet};

use log::{debug, info};

use super::error::{ConstraintViolation, SchemaError, StorageError};
use super::table::{Column, Constraint, DataType, Row, Schema, Table, Value};

/// Owns every persisted table. Not synchronised; callers that share it
/// across threads must wrap it in a lock.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Registers an empty table with `columns` in declared order.
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<(), SchemaError> {
        if self.tables.contains_key(name) {
            return Err(SchemaError::TableAlreadyExists(name.to_string()));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumnName {
                    table: name.to_string(),
                    column: column.name.clone(),
                });
            }
        }

        info!("created table {} with {} columns", name, columns.len());
        self.tables
            .insert(name.to_string(), Table::new(name, Schema::new(columns)));
        Ok(())
    }

    /// Like `create_table`, but an existing table is left untouched.
    /// Returns whether a table was created.
    pub fn create_table_if_not_exists(
        &mut self,
        name: &str,
        columns: Vec<Column>,
    ) -> Result<bool, SchemaError> {
        if self.tables.contains_key(name) {
            debug!("table {} already exists, skipping create", name);
            return Ok(false);
        }
        self.create_table(name, columns)?;
        Ok(true)
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Validates and appends one row. Values arrive as raw literal text; an
    /// empty string means "no value supplied". Columns missing from
    /// `column_names` are treated as empty. Nothing is written on failure.
    pub fn insert_row(
        &mut self,
        table_name: &str,
        column_names: Option<&[String]>,
        values: &[String],
    ) -> Result<(), StorageError> {
        let table = self
            .tables
            .get_mut(table_name)
            .ok_or_else(|| SchemaError::TableNotFound(table_name.to_string()))?;

        let provided = match column_names {
            None => {
                if values.len() != table.column_count() {
                    return Err(SchemaError::ColumnCountMismatch {
                        expected: table.column_count(),
                        found: values.len(),
                    }
                    .into());
                }
                table
                    .schema
                    .columns
                    .iter()
                    .map(|c| c.name.clone())
                    .zip(values.iter().cloned())
                    .collect::<Vec<_>>()
            }
            Some(names) => {
                if names.len() != values.len() {
                    return Err(SchemaError::ColumnCountMismatch {
                        expected: names.len(),
                        found: values.len(),
                    }
                    .into());
                }
                let mut seen = HashSet::with_capacity(names.len());
                if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
                    return Err(SchemaError::DuplicateColumnName {
                        table: table_name.to_string(),
                        column: dup.clone(),
                    }
                    .into());
                }
                if let Some(unknown) = names.iter().find(|n| table.schema.column(n).is_none()) {
                    return Err(SchemaError::ColumnNotFound {
                        table: table_name.to_string(),
                        column: unknown.clone(),
                    }
                    .into());
                }
                names.iter().cloned().zip(values.iter().cloned()).collect()
            }
        };

        let mut row = Vec::with_capacity(table.column_count());
        for (idx, column) in table.schema.columns.iter().enumerate() {
            let raw = provided
                .iter()
                .find(|(name, _)| *name == column.name)
                .map(|(_, v)| v.as_str())
                .unwrap_or("");
            let value = coerce_value(column, raw)?;

            if column.is_unique() && !value.is_null() {
                let duplicate = table
                    .rows
                    .iter()
                    .any(|r| r.get(idx).map_or(false, |existing| *existing == value));
                if duplicate {
                    return Err(ConstraintViolation::Unique {
                        column: column.name.clone(),
                        value: value.to_string(),
                    }
                    .into());
                }
            }

            row.push(value);
        }

        table.add_row(Row::new(row));
        info!("inserted row into {}", table_name);
        Ok(())
    }
}

/// Applies DEFAULT substitution, the NOT NULL check and declared-type
/// coercion to one raw value.
fn coerce_value(column: &Column, raw: &str) -> Result<Value, ConstraintViolation> {
    // Only the empty string means "no value"; whitespace is kept as given.
    let raw = match column.default_value() {
        Some(default) if raw.is_empty() => default,
        _ => raw,
    };
    if raw.is_empty() {
        if column.has_constraint(&Constraint::NotNull) {
            return Err(ConstraintViolation::NotNull {
                column: column.name.clone(),
            });
        }
        return Ok(Value::Null);
    }

    let mismatch = || ConstraintViolation::TypeMismatch {
        column: column.name.clone(),
        expected: column.data_type.to_string(),
        value: raw.to_string(),
    };

    match &column.data_type {
        DataType::Int => raw.trim().parse::<i64>().map(Value::Integer).map_err(|_| mismatch()),
        DataType::Float => raw.trim().parse::<f64>().map(Value::Float).map_err(|_| mismatch()),
        DataType::Varchar(max) => {
            let actual = raw.chars().count();
            if actual > *max {
                Err(ConstraintViolation::VarcharTooLong {
                    column: column.name.clone(),
                    max: *max,
                    actual,
                })
            } else {
                Ok(Value::String(raw.to_string()))
            }
        }
        DataType::Other(_) => Ok(Value::String(raw.to_string())),
    }
}
