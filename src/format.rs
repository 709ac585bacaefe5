use crate::cli::OutputFormat;
use crate::storage::table::{Table, Value};

/// Renders the visible columns of `table` in the requested format.
pub fn render(table: &Table, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_grid(table),
        OutputFormat::Csv => render_csv(table),
        OutputFormat::Json => render_json(table),
    }
}

fn visible_columns(table: &Table) -> Vec<usize> {
    table
        .schema
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.visible)
        .map(|(i, _)| i)
        .collect()
}

fn cell(table: &Table, row: usize, col: usize) -> String {
    table.rows[row]
        .get(col)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// ASCII box grid; each column is as wide as its header or widest cell.
pub fn render_grid(table: &Table) -> String {
    let columns = visible_columns(table);

    let widths: Vec<usize> = columns
        .iter()
        .map(|&i| {
            let header_width = table.schema.columns[i].name.chars().count();
            let max_value_width = (0..table.row_count())
                .map(|r| cell(table, r, i).chars().count())
                .max()
                .unwrap_or(0);
            header_width.max(max_value_width)
        })
        .collect();

    let border: String = widths
        .iter()
        .map(|&w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+";

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("| {:<width$} ", c, width = w))
            .collect::<String>()
            + "|"
    };

    let mut out = Vec::with_capacity(table.row_count() + 5);
    out.push(border.clone());
    out.push(line(
        columns
            .iter()
            .map(|&i| table.schema.columns[i].name.clone())
            .collect(),
    ));
    out.push(border.clone());
    for r in 0..table.row_count() {
        out.push(line(columns.iter().map(|&i| cell(table, r, i)).collect()));
    }
    if table.row_count() > 0 {
        out.push(border);
    }
    out.push(format!("({} rows)", table.row_count()));
    out.join("\n")
}

pub fn render_csv(table: &Table) -> String {
    let columns = visible_columns(table);
    let mut out = Vec::with_capacity(table.row_count() + 1);

    out.push(
        columns
            .iter()
            .map(|&i| csv_escape(&table.schema.columns[i].name))
            .collect::<Vec<_>>()
            .join(","),
    );
    for r in 0..table.row_count() {
        out.push(
            columns
                .iter()
                .map(|&i| csv_escape(&cell(table, r, i)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    out.join("\n")
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn render_json(table: &Table) -> String {
    let columns = visible_columns(table);

    let rows: Vec<String> = table
        .rows
        .iter()
        .map(|row| {
            let fields: Vec<String> = columns
                .iter()
                .map(|&i| {
                    let val = match row.get(i) {
                        Some(Value::String(s)) => json_string(s),
                        Some(Value::Float(f)) if !f.is_finite() => "null".to_string(),
                        Some(Value::Null) | None => "null".to_string(),
                        Some(v) => v.to_string(),
                    };
                    format!("{}:{}", json_string(&table.schema.columns[i].name), val)
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        })
        .collect();

    format!("[{}]", rows.join(","))
}

fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::table::{Column, DataType, Row, Schema, HIDDEN_COUNT_COLUMN};

    fn sample() -> Table {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Int),
            Column::new("name", DataType::Varchar(20)),
            Column::new(HIDDEN_COUNT_COLUMN, DataType::Float).hidden(),
        ]);
        let rows = vec![
            Row::new(vec![
                Value::Integer(1),
                Value::String("Widget".to_string()),
                Value::Float(1.0),
            ]),
            Row::new(vec![
                Value::Integer(22),
                Value::String("a, \"b\"".to_string()),
                Value::Float(1.0),
            ]),
        ];
        Table::with_rows("result", schema, rows)
    }

    #[test]
    fn test_grid_layout() {
        let expected = "\
+----+--------+
| id | name   |
+----+--------+
| 1  | Widget |
| 22 | a, \"b\" |
+----+--------+
(2 rows)";
        assert_eq!(render_grid(&sample()), expected);
    }

    #[test]
    fn test_grid_empty_table() {
        let table = Table::new("t", Schema::new(vec![Column::new("x", DataType::Int)]));
        assert_eq!(render_grid(&table), "+---+\n| x |\n+---+\n(0 rows)");
    }

    #[test]
    fn test_csv_hides_counter_and_quotes() {
        assert_eq!(render_csv(&sample()), "id,name\n1,Widget\n22,\"a, \"\"b\"\"\"");
    }

    #[test]
    fn test_json_output() {
        assert_eq!(
            render(&sample(), OutputFormat::Json),
            r#"[{"id":1,"name":"Widget"},{"id":22,"name":"a, \"b\""}]"#
        );
    }
}
