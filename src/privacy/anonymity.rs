use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::storage::table::{Row, Table};

/// How the l-diversity filter measures diversity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LDiversityMode {
    /// Drops a sensitive column outright when it has fewer than `l` distinct
    /// values across the whole result.
    #[default]
    Column,
    /// Drops the rows of every quasi-identifier class in which a sensitive
    /// column has fewer than `l` distinct values.
    EquivalenceClass,
}

/// Resolves `names` to column indices, warning about and skipping unknown ones.
fn resolve_columns(table: &Table, names: &[String], purpose: &str) -> Vec<usize> {
    names
        .iter()
        .filter_map(|name| {
            let idx = table.get_column_index(name);
            if idx.is_none() {
                warn!("{} column {} not found in result, ignoring", purpose, name);
            }
            idx
        })
        .collect()
}

fn visible_indices(table: &Table) -> Vec<usize> {
    table
        .schema
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.visible)
        .map(|(i, _)| i)
        .collect()
}

fn class_key(row: &Row, indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| row.get(i).map(|v| v.to_string()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("|")
}

/// Drops every row whose quasi-identifier tuple occurs fewer than `k`
/// times. Grouped results are judged by their hidden row counter; other
/// tables are counted directly. An empty `quasi_identifiers` means every
/// visible column.
pub fn enforce_k_anonymity(table: Table, quasi_identifiers: &[String], k: usize) -> Table {
    let before = table.row_count();

    let frequencies: Vec<f64> = match table.schema.hidden_count_index() {
        Some(count_idx) => table
            .iter()
            .map(|row| row.get(count_idx).map_or(0.0, |v| v.to_number()))
            .collect(),
        None => {
            let indices = if quasi_identifiers.is_empty() {
                visible_indices(&table)
            } else {
                resolve_columns(&table, quasi_identifiers, "quasi-identifier")
            };
            let keys: Vec<String> = table.iter().map(|row| class_key(row, &indices)).collect();
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for key in &keys {
                *counts.entry(key.as_str()).or_insert(0) += 1;
            }
            keys.iter().map(|key| counts[key.as_str()] as f64).collect()
        }
    };

    let Table { name, schema, rows } = table;
    let rows: Vec<Row> = rows
        .into_iter()
        .zip(frequencies)
        .filter(|(_, freq)| *freq >= k as f64)
        .map(|(row, _)| row)
        .collect();

    debug!("k-anonymity (k = {}) kept {} of {} rows", k, rows.len(), before);
    Table::with_rows(name, schema, rows)
}

/// Column-level l-diversity: removes each listed column that takes fewer
/// than `l` distinct values across the table. Unlisted columns are kept.
pub fn enforce_l_diversity(table: Table, sensitive: &[String], l: usize) -> Table {
    let sensitive_indices = resolve_columns(&table, sensitive, "sensitive");

    let dropped: HashSet<usize> = sensitive_indices
        .into_iter()
        .filter(|&idx| {
            let distinct: HashSet<String> = table
                .iter()
                .filter_map(|row| row.get(idx).map(|v| v.key()))
                .collect();
            distinct.len() < l
        })
        .collect();

    if dropped.is_empty() {
        return table;
    }

    for &idx in &dropped {
        debug!(
            "l-diversity (l = {}) dropped column {}",
            l, table.schema.columns[idx].name
        );
    }

    let kept: Vec<usize> = (0..table.column_count())
        .filter(|idx| !dropped.contains(idx))
        .collect();
    table.retain_columns(&kept)
}

/// Per-equivalence-class l-diversity: rows are grouped by their
/// quasi-identifier tuple and a whole class is removed unless every
/// sensitive column shows at least `l` distinct values inside it. An empty
/// `quasi_identifiers` means every visible non-sensitive column.
pub fn enforce_l_diversity_per_class(
    table: Table,
    quasi_identifiers: &[String],
    sensitive: &[String],
    l: usize,
) -> Table {
    let sensitive_indices = resolve_columns(&table, sensitive, "sensitive");
    if sensitive_indices.is_empty() {
        return table;
    }

    let qi_indices: Vec<usize> = if quasi_identifiers.is_empty() {
        visible_indices(&table)
            .into_iter()
            .filter(|idx| !sensitive_indices.contains(idx))
            .collect()
    } else {
        resolve_columns(&table, quasi_identifiers, "quasi-identifier")
    };

    let keys: Vec<String> = table.iter().map(|row| class_key(row, &qi_indices)).collect();

    let mut classes: HashMap<&str, Vec<HashSet<String>>> = HashMap::new();
    for (row, key) in table.iter().zip(&keys) {
        let sets = classes
            .entry(key.as_str())
            .or_insert_with(|| vec![HashSet::new(); sensitive_indices.len()]);
        for (set, &idx) in sets.iter_mut().zip(&sensitive_indices) {
            if let Some(value) = row.get(idx) {
                set.insert(value.key());
            }
        }
    }

    let diverse: HashSet<&str> = classes
        .iter()
        .filter(|(_, sets)| sets.iter().all(|set| set.len() >= l))
        .map(|(key, _)| *key)
        .collect();

    let keep: Vec<bool> = keys.iter().map(|key| diverse.contains(key.as_str())).collect();
    let before = table.row_count();

    let Table { name, schema, rows } = table;
    let rows: Vec<Row> = rows
        .into_iter()
        .zip(keep)
        .filter(|(_, keep)| *keep)
        .map(|(row, _)| row)
        .collect();

    debug!(
        "per-class l-diversity (l = {}) kept {} of {} rows",
        l,
        rows.len(),
        before
    );
    Table::with_rows(name, schema, rows)
}
