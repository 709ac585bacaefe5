use std::cmp::Ordering;

use super::ast::{BinaryOperator, Expr};
use super::executor::ExecutionError;
use crate::storage::table::{Row, Schema, Value};

/// Evaluates `expr` against one row described by `schema`.
///
/// Arithmetic always coerces both operands to numbers and yields a float;
/// dividing by zero saturates to `0.0` instead of failing. Comparisons with
/// a NULL operand are false.
pub fn evaluate(expr: &Expr, row: &Row, schema: &Schema) -> Result<Value, ExecutionError> {
    match expr {
        Expr::Integer(n) => Ok(Value::Integer(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Boolean(b) => Ok(Value::Boolean(*b)),
        Expr::Null => Ok(Value::Null),

        Expr::Column(name) => Ok(schema
            .column_index(name)
            .and_then(|idx| row.get(idx))
            .cloned()
            .unwrap_or(Value::Null)),

        Expr::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, row, schema)?;
            let right_val = evaluate(right, row, schema)?;
            apply_binary_op(&left_val, *op, &right_val)
        }

        Expr::Not(inner) => {
            let val = evaluate(inner, row, schema)?;
            Ok(Value::Boolean(!val.is_truthy()))
        }
    }
}

fn apply_binary_op(
    left: &Value,
    op: BinaryOperator,
    right: &Value,
) -> Result<Value, ExecutionError> {
    match op {
        BinaryOperator::Add => Ok(Value::Float(left.to_number() + right.to_number())),
        BinaryOperator::Subtract => Ok(Value::Float(left.to_number() - right.to_number())),
        BinaryOperator::Multiply => Ok(Value::Float(left.to_number() * right.to_number())),
        BinaryOperator::Divide => {
            let divisor = right.to_number();
            if divisor == 0.0 {
                Ok(Value::Float(0.0))
            } else {
                Ok(Value::Float(left.to_number() / divisor))
            }
        }

        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq => {
            let Some(ordering) = compare(left, right) else {
                return Ok(Value::Boolean(false));
            };
            let result = match op {
                BinaryOperator::Eq => ordering == Ordering::Equal,
                BinaryOperator::NotEq => ordering != Ordering::Equal,
                BinaryOperator::Lt => ordering == Ordering::Less,
                BinaryOperator::LtEq => ordering != Ordering::Greater,
                BinaryOperator::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Boolean(result))
        }

        BinaryOperator::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
        BinaryOperator::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),

        BinaryOperator::Modulo => Err(ExecutionError::UnsupportedOperator(op.to_string())),
    }
}

/// Numeric ordering when both sides are numbers, textual otherwise.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if left.is_null() || right.is_null() {
        return None;
    }
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(left.to_string().cmp(&right.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::table::{Column, DataType};

    fn fixture() -> (Row, Schema) {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Int),
            Column::new("name", DataType::Varchar(20)),
            Column::new("price", DataType::Float),
        ]);
        let row = Row::new(vec![
            Value::Integer(7),
            Value::String("Alice".to_string()),
            Value::Float(2.5),
        ]);
        (row, schema)
    }

    fn eval(expr: &Expr) -> Result<Value, ExecutionError> {
        let (row, schema) = fixture();
        evaluate(expr, &row, &schema)
    }

    #[test]
    fn test_literals_and_columns() {
        assert_eq!(eval(&Expr::Integer(3)).unwrap(), Value::Integer(3));
        assert_eq!(eval(&Expr::Boolean(true)).unwrap(), Value::Boolean(true));
        assert_eq!(
            eval(&Expr::column("name")).unwrap(),
            Value::String("Alice".to_string())
        );
        assert_eq!(eval(&Expr::column("missing")).unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic_coerces_to_float() {
        let expr = Expr::binary(Expr::column("id"), BinaryOperator::Multiply, Expr::column("price"));
        assert_eq!(eval(&expr).unwrap(), Value::Float(17.5));

        let expr = Expr::binary(
            Expr::String("10".to_string()),
            BinaryOperator::Subtract,
            Expr::column("name"),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Float(10.0));
    }

    #[test]
    fn test_division_by_zero_saturates() {
        let expr = Expr::binary(Expr::column("id"), BinaryOperator::Divide, Expr::Integer(0));
        assert_eq!(eval(&expr).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn test_modulo_is_unsupported() {
        let expr = Expr::binary(Expr::column("id"), BinaryOperator::Modulo, Expr::Integer(2));
        assert!(matches!(
            eval(&expr),
            Err(ExecutionError::UnsupportedOperator(ref op)) if op == "%"
        ));
    }

    #[test]
    fn test_comparisons() {
        let gt = Expr::binary(Expr::column("id"), BinaryOperator::Gt, Expr::Float(6.5));
        assert_eq!(eval(&gt).unwrap(), Value::Boolean(true));

        let eq = Expr::binary(
            Expr::column("name"),
            BinaryOperator::Eq,
            Expr::String("Alice".to_string()),
        );
        assert_eq!(eval(&eq).unwrap(), Value::Boolean(true));

        let null_cmp = Expr::binary(Expr::column("missing"), BinaryOperator::NotEq, Expr::Integer(1));
        assert_eq!(eval(&null_cmp).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_logical_operators() {
        let expr = Expr::binary(
            Expr::Not(Box::new(Expr::Boolean(false))),
            BinaryOperator::And,
            Expr::binary(Expr::Null, BinaryOperator::Or, Expr::column("id")),
        );
        assert_eq!(eval(&expr).unwrap(), Value::Boolean(true));
    }
}
