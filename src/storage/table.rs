use std::collections::HashMap;
use std::fmt;

/// Name of the hidden per-bucket row counter appended to grouped results.
pub const HIDDEN_COUNT_COLUMN: &str = "count";

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Int,
    Float,
    Varchar(usize),
    /// Any other declared type name; values are stored as raw text.
    Other(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    PrimaryKey,
    Unique,
    NotNull,
    Default(String),
    /// Unrecognised token kept verbatim.
    Other(String),
}

impl Constraint {
    pub fn is_unique(&self) -> bool {
        matches!(self, Constraint::PrimaryKey | Constraint::Unique)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::PrimaryKey => write!(f, "PRIMARY KEY"),
            Constraint::Unique => write!(f, "UNIQUE"),
            Constraint::NotNull => write!(f, "NOT NULL"),
            Constraint::Default(v) => write!(f, "DEFAULT {}", v),
            Constraint::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl Value {
    /// Lenient numeric coercion shared by aggregation and arithmetic:
    /// integers widen, parseable text converts, everything else is `0.0`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Boolean(_) | Value::Null => 0.0,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Null => false,
        }
    }

    /// Canonical encoding used to hash and compare values for grouping.
    pub fn key(&self) -> String {
        format!("{:?}", self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<Constraint>,
    /// False only for bookkeeping columns such as the hidden row counter.
    pub visible: bool,
    /// Set on aggregate outputs; the noise mechanism only touches these.
    pub function_result: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
            visible: true,
            function_result: false,
        }
    }

    pub fn with_constraints(mut self, constraints: Vec<Constraint>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn function_result(mut self) -> Self {
        self.function_result = true;
        self
    }

    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains(constraint)
    }

    pub fn is_unique(&self) -> bool {
        self.constraints.iter().any(Constraint::is_unique)
    }

    pub fn default_value(&self) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Default(v) => Some(v.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub columns: Vec<Column>,
    column_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (i, c) in columns.iter().enumerate() {
            // First declaration wins so a visible column can shadow the hidden counter.
            column_index.entry(c.name.clone()).or_insert(i);
        }
        Self {
            columns,
            column_index,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn visible_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Index of the hidden row counter, if this schema carries one.
    pub fn hidden_count_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| !c.visible && c.name == HIDDEN_COUNT_COLUMN)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            schema,
            rows,
        }
    }

    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.schema.column_index(name)
    }

    /// Value of `column` in row `row`, `None` if either is out of range.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.get_column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Keeps only the columns at `indices`, in that order, for schema and rows alike.
    pub fn retain_columns(self, indices: &[usize]) -> Table {
        let columns = indices
            .iter()
            .map(|&i| self.schema.columns[i].clone())
            .collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                Row::new(
                    indices
                        .iter()
                        .map(|&i| row.values.get(i).cloned().unwrap_or(Value::Null))
                        .collect(),
                )
            })
            .collect();
        Table::with_rows(self.name, Schema::new(columns), rows)
    }
}
