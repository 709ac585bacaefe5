use std::collections::{HashMap, HashSet};

use log::debug;
use thiserror::Error;

use super::ast::*;
use super::eval::evaluate;
use super::parser::Parser;
use crate::error::Error;
use crate::storage::table::{Column, DataType, Row, Schema, Table, Value, HIDDEN_COUNT_COLUMN};
use crate::storage::{Catalog, SchemaError, StorageError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
}

impl From<SchemaError> for ExecutionError {
    fn from(err: SchemaError) -> Self {
        ExecutionError::Storage(err.into())
    }
}

/// What a successfully executed statement produced.
#[derive(Debug, Clone)]
pub enum StatementOutcome {
    /// `created` is false when `IF NOT EXISTS` found an existing table.
    Created { table: String, created: bool },
    Inserted { table: String },
    Selected(Table),
}

/// Runs statements against a catalog it borrows exclusively.
pub struct Executor<'a> {
    catalog: &'a mut Catalog,
}

impl<'a> Executor<'a> {
    pub fn new(catalog: &'a mut Catalog) -> Self {
        Self { catalog }
    }

    pub fn execute(&mut self, stmt: Statement) -> Result<StatementOutcome, ExecutionError> {
        debug!("executing statement on {}", stmt.table_name());
        match stmt {
            Statement::Create(create) => {
                let table = create.table_name.clone();
                let created = execute_create(self.catalog, create)?;
                Ok(StatementOutcome::Created { table, created })
            }
            Statement::Insert(insert) => {
                let table = insert.table_name.clone();
                execute_insert(self.catalog, insert)?;
                Ok(StatementOutcome::Inserted { table })
            }
            Statement::Select(select) => {
                execute_select(self.catalog, &select).map(StatementOutcome::Selected)
            }
        }
    }
}

/// Returns whether a new table was registered.
pub fn execute_create(catalog: &mut Catalog, stmt: CreateStatement) -> Result<bool, ExecutionError> {
    let columns = stmt.columns.into_iter().map(ColumnDef::into_column).collect();
    if stmt.if_not_exists {
        Ok(catalog.create_table_if_not_exists(&stmt.table_name, columns)?)
    } else {
        catalog.create_table(&stmt.table_name, columns)?;
        Ok(true)
    }
}

pub fn execute_insert(catalog: &mut Catalog, stmt: InsertStatement) -> Result<(), ExecutionError> {
    catalog.insert_row(&stmt.table_name, stmt.column_names.as_deref(), &stmt.values)?;
    Ok(())
}

/// Runs a SELECT and returns a fresh, unpersisted result table.
///
/// Without aggregates or group keys rows pass through one-to-one. Otherwise
/// rows are bucketed by their group-key tuple, in first-seen order, and a
/// hidden `count` column records each bucket's size.
pub fn execute_select(catalog: &Catalog, stmt: &SelectStatement) -> Result<Table, ExecutionError> {
    let source = catalog
        .get_table(&stmt.table_name)
        .ok_or_else(|| SchemaError::TableNotFound(stmt.table_name.clone()))?;

    let items = expand_wildcards(&stmt.items, &source.schema);
    let slots = resolve_slots(&items, source)?;

    let mut names = HashSet::with_capacity(items.len());
    if let Some(dup) = items.iter().find(|item| !names.insert(item.alias.as_str())) {
        return Err(SchemaError::DuplicateColumnName {
            table: stmt.table_name.clone(),
            column: dup.alias.clone(),
        }
        .into());
    }

    let mut rows = Vec::new();
    for row in source.iter() {
        if let Some(predicate) = &stmt.where_clause {
            if !evaluate(predicate, row, &source.schema)?.is_truthy() {
                continue;
            }
        }
        rows.push(row);
    }

    let mut columns: Vec<Column> = items
        .iter()
        .zip(&slots)
        .map(|(item, slot)| output_column(item, *slot, &source.schema))
        .collect();

    let result_rows = if stmt.is_aggregate() {
        columns.push(Column::new(HIDDEN_COUNT_COLUMN, DataType::Float).hidden());
        aggregate(&items, &slots, &rows)
    } else {
        rows.iter()
            .map(|row| Row::new(slots.iter().map(|slot| source_value(row, *slot)).collect()))
            .collect()
    };

    debug!(
        "select from {} produced {} rows from {} input rows",
        stmt.table_name,
        result_rows.len(),
        source.row_count()
    );

    Ok(Table::with_rows("result", Schema::new(columns), result_rows))
}

fn expand_wildcards(items: &[SelectItem], schema: &Schema) -> Vec<SelectItem> {
    let mut expanded = Vec::with_capacity(items.len());
    for item in items {
        if item.is_wildcard() {
            for col in &schema.columns {
                expanded.push(SelectItem::new(col.name.clone(), SelectItemKind::Normal));
            }
        } else {
            expanded.push(item.clone());
        }
    }
    expanded
}

/// Source column index per item; `None` for `COUNT(*)`.
fn resolve_slots(items: &[SelectItem], source: &Table) -> Result<Vec<Option<usize>>, ExecutionError> {
    items
        .iter()
        .map(|item| {
            if item.source_column == WILDCARD {
                return Ok(None);
            }
            source
                .get_column_index(&item.source_column)
                .map(Some)
                .ok_or_else(|| {
                    ExecutionError::from(SchemaError::ColumnNotFound {
                        table: source.name.clone(),
                        column: item.source_column.clone(),
                    })
                })
        })
        .collect()
}

fn output_column(item: &SelectItem, slot: Option<usize>, schema: &Schema) -> Column {
    if item.kind.is_aggregate() {
        return Column::new(item.alias.clone(), DataType::Float).function_result();
    }
    let data_type = slot
        .map(|idx| schema.columns[idx].data_type.clone())
        .unwrap_or(DataType::Float);
    Column::new(item.alias.clone(), data_type)
}

fn source_value(row: &Row, slot: Option<usize>) -> Value {
    slot.and_then(|idx| row.get(idx))
        .cloned()
        .unwrap_or(Value::Null)
}

struct Bucket {
    values: Vec<Value>,
    count: f64,
}

fn aggregate(items: &[SelectItem], slots: &[Option<usize>], rows: &[&Row]) -> Vec<Row> {
    let key_slots: Vec<Option<usize>> = items
        .iter()
        .zip(slots)
        .filter(|(item, _)| item.kind == SelectItemKind::GroupKey)
        .map(|(_, slot)| *slot)
        .collect();

    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for row in rows {
        let key: Vec<String> = key_slots
            .iter()
            .map(|slot| source_value(row, *slot).key())
            .collect();

        match index.get(&key) {
            Some(&b) => {
                let bucket = &mut buckets[b];
                for ((item, slot), current) in items.iter().zip(slots).zip(bucket.values.iter_mut()) {
                    accumulate(item.kind, current, source_value(row, *slot));
                }
                bucket.count += 1.0;
            }
            None => {
                let values = items
                    .iter()
                    .zip(slots)
                    .map(|(item, slot)| seed(item.kind, source_value(row, *slot)))
                    .collect();
                index.insert(key, buckets.len());
                buckets.push(Bucket { values, count: 1.0 });
            }
        }
    }

    buckets
        .into_iter()
        .map(|mut bucket| {
            for (item, value) in items.iter().zip(bucket.values.iter_mut()) {
                if item.kind == SelectItemKind::Avg {
                    let sum = value.to_number();
                    let avg = if bucket.count != 0.0 { sum / bucket.count } else { 0.0 };
                    *value = Value::Float(avg);
                }
            }
            bucket.values.push(Value::Float(bucket.count));
            Row::new(bucket.values)
        })
        .collect()
}

fn seed(kind: SelectItemKind, value: Value) -> Value {
    match kind {
        SelectItemKind::Sum | SelectItemKind::Avg => Value::Float(value.to_number()),
        SelectItemKind::Count => Value::Float(1.0),
        SelectItemKind::Min
        | SelectItemKind::Max
        | SelectItemKind::Normal
        | SelectItemKind::GroupKey => value,
    }
}

fn accumulate(kind: SelectItemKind, current: &mut Value, value: Value) {
    match kind {
        SelectItemKind::Sum | SelectItemKind::Avg => {
            *current = Value::Float(current.to_number() + value.to_number());
        }
        SelectItemKind::Count => {
            *current = Value::Float(current.to_number() + 1.0);
        }
        // Ties go to the newer value.
        SelectItemKind::Min => {
            if current.to_number() >= value.to_number() {
                *current = value;
            }
        }
        SelectItemKind::Max => {
            if current.to_number() <= value.to_number() {
                *current = value;
            }
        }
        SelectItemKind::Normal | SelectItemKind::GroupKey => {}
    }
}

/// Parses and runs a whole script, one result per statement. A statement
/// that fails to parse or execute does not stop the ones after it.
pub fn execute_script(catalog: &mut Catalog, sql: &str) -> Vec<Result<StatementOutcome, Error>> {
    let parsed = Parser::from_sql(sql).parse_all();
    let mut executor = Executor::new(catalog);

    parsed
        .into_iter()
        .map(|stmt| -> Result<StatementOutcome, Error> {
            let stmt = stmt?;
            Ok(executor.execute(stmt)?)
        })
        .collect()
}
