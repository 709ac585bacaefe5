use std::fmt;

use crate::storage::table::{Column, Constraint, DataType};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Create(CreateStatement),
    Insert(InsertStatement),
    Select(SelectStatement),
}

impl Statement {
    pub fn table_name(&self) -> &str {
        match self {
            Statement::Create(s) => &s.table_name,
            Statement::Insert(s) => &s.table_name,
            Statement::Select(s) => &s.table_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateStatement {
    pub table_name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<Constraint>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
        }
    }

    pub fn into_column(self) -> Column {
        Column::new(self.name, self.data_type).with_constraints(self.constraints)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table_name: String,
    /// `None` when the statement omits the parenthesised column list.
    pub column_names: Option<Vec<String>>,
    /// Raw literal text per value; empty means no value was supplied.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub table_name: String,
    pub items: Vec<SelectItem>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<String>,
}

impl SelectStatement {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            items: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
        }
    }

    /// True when the result must go through group bucketing.
    pub fn is_aggregate(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.kind != SelectItemKind::Normal)
    }
}

/// Source column name that stands for "every column" (`*`).
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectItemKind {
    Normal,
    GroupKey,
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl SelectItemKind {
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, SelectItemKind::Normal | SelectItemKind::GroupKey)
    }

    pub fn function_name(&self) -> Option<&'static str> {
        match self {
            SelectItemKind::Count => Some("count"),
            SelectItemKind::Sum => Some("sum"),
            SelectItemKind::Avg => Some("avg"),
            SelectItemKind::Min => Some("min"),
            SelectItemKind::Max => Some("max"),
            SelectItemKind::Normal | SelectItemKind::GroupKey => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub source_column: String,
    pub kind: SelectItemKind,
    pub alias: String,
}

impl SelectItem {
    /// Builds an item with its default alias: the column name for plain
    /// references, `<func>_<column>` for aggregates.
    pub fn new(source_column: impl Into<String>, kind: SelectItemKind) -> Self {
        let source_column = source_column.into();
        let alias = match kind.function_name() {
            Some(func) if source_column == WILDCARD => format!("{}_star", func),
            Some(func) => format!("{}_{}", func, source_column),
            None => source_column.clone(),
        };
        Self {
            source_column,
            kind,
            alias,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.source_column == WILDCARD && !self.kind.is_aggregate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,

    Column(String),

    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    Not(Box<Expr>),
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        write!(f, "{}", s)
    }
}
