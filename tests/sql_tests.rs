use veilsql::sql::parser::ParseError;
use veilsql::sql::{ExecutionError, Statement, StatementOutcome};
use veilsql::storage::{ConstraintViolation, SchemaError, StorageError};
use veilsql::{
    execute_create, execute_insert, execute_select, parse, tokenize, Catalog, DataType, Error,
    Session, Table, Value,
};

fn run(catalog: &mut Catalog, sql: &str) {
    for stmt in parse(tokenize(sql)).unwrap() {
        match stmt {
            Statement::Create(create) => {
                execute_create(catalog, create).unwrap();
            }
            Statement::Insert(insert) => execute_insert(catalog, insert).unwrap(),
            Statement::Select(_) => panic!("use query() for SELECT"),
        }
    }
}

fn query(catalog: &Catalog, sql: &str) -> Table {
    let mut stmts = parse(tokenize(sql)).unwrap();
    match stmts.remove(0) {
        Statement::Select(select) => execute_select(catalog, &select).unwrap(),
        other => panic!("expected SELECT, got {:?}", other),
    }
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

#[test]
fn test_create_insert_select_star() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE users (id INT, name VARCHAR(50));
         INSERT INTO users (id,name) VALUES (1,Alice);",
    );

    let result = query(&catalog, "SELECT * FROM users;");
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.schema.column_names(), vec!["id", "name"]);
    assert_eq!(result.value(0, "id"), Some(&Value::Integer(1)));
    assert_eq!(result.value(0, "name"), Some(&text("Alice")));
}

#[test]
fn test_default_fills_missing_column() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE products(product_id INT PRIMARY KEY, price FLOAT DEFAULT 0);
         INSERT INTO products (product_id) VALUES (5);",
    );

    let table = catalog.get_table("products").unwrap();
    assert_eq!(table.value(0, "price"), Some(&Value::Float(0.0)));
}

#[test]
fn test_group_by_count_with_alias() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE t (id INT, dept VARCHAR(10));
         INSERT INTO t VALUES (1, 'A');
         INSERT INTO t VALUES (2, 'A');
         INSERT INTO t VALUES (3, 'B');",
    );

    let result = query(&catalog, "SELECT dept, COUNT(id) AS c FROM t GROUP BY dept");
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.schema.visible_column_names(), vec!["dept", "c"]);
    assert_eq!(result.value(0, "dept"), Some(&text("A")));
    assert_eq!(result.value(0, "c"), Some(&Value::Float(2.0)));
    assert_eq!(result.value(1, "dept"), Some(&text("B")));
    assert_eq!(result.value(1, "c"), Some(&Value::Float(1.0)));
}

#[test]
fn test_avg_equals_sum_over_count() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE sales (region VARCHAR(10), amount FLOAT);
         INSERT INTO sales VALUES ('north', 10);
         INSERT INTO sales VALUES ('south', 7.5);
         INSERT INTO sales VALUES ('north', 25);
         INSERT INTO sales VALUES ('north', 4);
         INSERT INTO sales VALUES ('south', 1);",
    );

    let result = query(
        &catalog,
        "SELECT region, AVG(amount), SUM(amount) AS s, COUNT(amount) AS n FROM sales GROUP BY region;",
    );
    for row in 0..result.row_count() {
        let avg = result.value(row, "avg_amount").unwrap().to_number();
        let sum = result.value(row, "s").unwrap().to_number();
        let n = result.value(row, "n").unwrap().to_number();
        assert!((avg - sum / n).abs() < 1e-9);
    }
    assert_eq!(result.value(0, "avg_amount"), Some(&Value::Float(13.0)));
}

#[test]
fn test_select_without_grouping_keeps_every_row() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE t (dept VARCHAR(5));
         INSERT INTO t VALUES ('A');
         INSERT INTO t VALUES ('A');",
    );

    let result = query(&catalog, "SELECT dept AS d FROM t;");
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.schema.column_names(), vec!["d"]);
    assert_eq!(result.schema.column("d").unwrap().data_type, DataType::Varchar(5));
}

#[test]
fn test_grouping_collapses_duplicates() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE t (dept VARCHAR(5));
         INSERT INTO t VALUES ('A');
         INSERT INTO t VALUES ('B');
         INSERT INTO t VALUES ('A');",
    );

    let result = query(&catalog, "SELECT dept FROM t GROUP BY dept;");
    assert_eq!(result.row_count(), 2);
    assert!(result.schema.hidden_count_index().is_some());
    assert_eq!(result.schema.visible_column_names(), vec!["dept"]);
}

#[test]
fn test_where_clause_filters_rows() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE emp (name VARCHAR(10), age INT, salary FLOAT);
         INSERT INTO emp VALUES ('ann', 31, 5000);
         INSERT INTO emp VALUES ('bob', 45, 7000);
         INSERT INTO emp VALUES ('cyd', 28, 4000);
         INSERT INTO emp VALUES ('dee', 52, 9000);",
    );

    let result = query(
        &catalog,
        "SELECT name FROM emp WHERE age > 30 AND NOT salary / 1000 >= 9;",
    );
    let names: Vec<&Value> = result.rows.iter().map(|r| &r.values[0]).collect();
    assert_eq!(names, vec![&text("ann"), &text("bob")]);

    let result = query(&catalog, "SELECT COUNT(*) FROM emp WHERE name = 'cyd' OR age < 0;");
    assert_eq!(result.value(0, "count_star"), Some(&Value::Float(1.0)));
}

#[test]
fn test_constraint_failures_leave_table_unchanged() {
    let mut catalog = Catalog::new();
    run(
        &mut catalog,
        "CREATE TABLE items (id INT PRIMARY KEY, code VARCHAR(3) UNIQUE NOT NULL);
         INSERT INTO items VALUES (1, 'abc');",
    );

    let attempts = [
        "INSERT INTO items VALUES (1, 'xyz');",
        "INSERT INTO items VALUES (2, 'abc');",
        "INSERT INTO items VALUES (2, '');",
        "INSERT INTO items VALUES (2, 'abcd');",
        "INSERT INTO items VALUES (two, 'x');",
    ];
    let mut violations = Vec::new();
    for sql in attempts {
        let mut stmts = parse(tokenize(sql)).unwrap();
        let Statement::Insert(insert) = stmts.remove(0) else {
            panic!("expected INSERT");
        };
        match execute_insert(&mut catalog, insert).unwrap_err() {
            ExecutionError::Storage(StorageError::Constraint(v)) => violations.push(v),
            other => panic!("unexpected error {:?}", other),
        }
    }

    assert!(matches!(&violations[0], ConstraintViolation::Unique { column, .. } if column == "id"));
    assert!(matches!(&violations[1], ConstraintViolation::Unique { column, .. } if column == "code"));
    assert!(matches!(&violations[2], ConstraintViolation::NotNull { column } if column == "code"));
    assert!(matches!(
        &violations[3],
        ConstraintViolation::VarcharTooLong { max: 3, actual: 4, .. }
    ));
    assert!(matches!(&violations[4], ConstraintViolation::TypeMismatch { .. }));
    assert_eq!(catalog.get_table("items").unwrap().row_count(), 1);
}

#[test]
fn test_schema_errors() {
    let mut catalog = Catalog::new();
    run(&mut catalog, "CREATE TABLE t (a INT);");

    let mut stmts = parse(tokenize("CREATE TABLE t (b INT); CREATE TABLE u (a INT, a FLOAT);")).unwrap();
    let Statement::Create(dup_table) = stmts.remove(0) else { panic!() };
    let Statement::Create(dup_column) = stmts.remove(0) else { panic!() };

    let err = execute_create(&mut catalog, dup_table).unwrap_err();
    assert_eq!(err.to_string(), SchemaError::TableAlreadyExists("t".to_string()).to_string());

    let err = execute_create(&mut catalog, dup_column).unwrap_err();
    assert!(err.to_string().contains("a"));
    assert!(!catalog.contains_table("u"));
}

#[test]
fn test_batch_reports_partial_success() {
    let mut session = Session::default();
    let results = session.execute(
        "CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(4) NOT NULL);
         INSERT INTO t VALUES (1, 'ok');
         INSERT INTO t VALUES (1, 'dup');
         INSERT INTO t VALUES (2, 'toolong');
         INSERT INTO t VALUES (3, 'fine');
         SELECT FROM t;
         INSERT INTO t VALUES (4, 'last');
         SELECT * FROM missing;
         SELECT id FROM t;",
    );

    assert_eq!(results.len(), 9);
    assert!(matches!(
        &results[2],
        Err(Error::Execution(ExecutionError::Storage(StorageError::Constraint(
            ConstraintViolation::Unique { .. }
        ))))
    ));
    assert!(matches!(&results[3], Err(Error::Execution(_))));
    assert!(matches!(
        &results[5],
        Err(Error::Parse(ParseError::UnexpectedToken { .. }))
    ));
    assert!(matches!(&results[7], Err(Error::Execution(_))));

    match &results[8] {
        Ok(StatementOutcome::Selected(table)) => {
            let ids: Vec<&Value> = table.rows.iter().map(|r| &r.values[0]).collect();
            assert_eq!(ids, vec![&Value::Integer(1), &Value::Integer(3), &Value::Integer(4)]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_group_by_must_be_projected() {
    let err = parse(tokenize("SELECT name FROM t GROUP BY dept;")).unwrap_err();
    assert_eq!(err, ParseError::GroupByColumnNotProjected("dept".to_string()));
}

#[test]
fn test_storage_errors_convert_into_crate_error() {
    let mut catalog = Catalog::new();
    let err: Error = catalog.insert_row("nope", None, &[]).unwrap_err().into();
    assert!(matches!(
        err,
        Error::Storage(StorageError::Schema(SchemaError::TableNotFound(_)))
    ));

    let violation = ConstraintViolation::NotNull {
        column: "x".to_string(),
    };
    let err: Error = StorageError::from(violation).into();
    assert!(err.to_string().contains("x"));
}
