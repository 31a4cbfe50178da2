//! Whole-table cleaning and column renaming.

use crate::table::Table;
use std::collections::{HashMap, HashSet};

/// Removes rows in which every cell is empty.
pub fn drop_empty_rows(table: Table) -> Table {
    table.retain_rows(|row| row.iter().any(|cell| !cell.is_empty()))
}

/// Removes rows identical to an earlier row, keeping the first occurrence
/// and the original row and column order.
pub fn deduplicate(table: Table) -> Table {
    let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(table.row_count());
    table.retain_rows(|row| seen.insert(row.to_vec()))
}

/// Renames columns using `mapping` (old name to new name).
///
/// Entries whose new name is blank are ignored, and so are old names that
/// are not columns of `table`.
pub fn rename_columns(table: Table, mapping: &HashMap<String, String>) -> Table {
    let effective = effective_mapping(mapping);
    if effective.is_empty() {
        return table;
    }

    let columns = table
        .columns()
        .iter()
        .map(|name| match effective.get(name.as_str()) {
            Some(new_name) => new_name.to_string(),
            None => name.clone(),
        })
        .collect();
    table.with_columns(columns)
}

/// Old names in `mapping` that would rename something but match no column.
pub fn unmatched_mapping_keys(table: &Table, mapping: &HashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<String> = effective_mapping(mapping)
        .into_keys()
        .filter(|old| table.column_index(old).is_none())
        .map(str::to_string)
        .collect();
    keys.sort();
    keys
}

fn effective_mapping(mapping: &HashMap<String, String>) -> HashMap<&str, &str> {
    mapping
        .iter()
        .filter(|(_, new_name)| !new_name.trim().is_empty())
        .map(|(old, new_name)| (old.as_str(), new_name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{deduplicate, drop_empty_rows, rename_columns, unmatched_mapping_keys};
    use crate::table::Table;
    use std::collections::HashMap;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn drop_empty_rows_keeps_partially_filled_rows() {
        let t = table(&["a", "b"], &[&["", ""], &["", "x"], &["1", "2"], &["", ""]]);
        let cleaned = drop_empty_rows(t);
        assert_eq!(cleaned.row_count(), 2);
        assert_eq!(cleaned.rows()[0][1], "x");
    }

    #[test]
    fn drop_empty_rows_treats_whitespace_as_content() {
        let t = table(&["a"], &[&[" "]]);
        assert_eq!(drop_empty_rows(t).row_count(), 1);
    }

    #[test]
    fn drop_empty_rows_is_idempotent() {
        let t = table(&["a", "b"], &[&["", ""], &["1", ""], &["", ""], &["1", ""]]);
        let once = drop_empty_rows(t.clone());
        assert_eq!(drop_empty_rows(once.clone()), once);
    }

    #[test]
    fn deduplicate_preserves_first_occurrence_order() {
        let t = table(
            &["k", "v"],
            &[&["b", "1"], &["a", "1"], &["b", "1"], &["a", "2"], &["a", "1"]],
        );
        let deduped = deduplicate(t);
        let keys: Vec<(&str, &str)> = deduped
            .rows()
            .iter()
            .map(|r| (r[0].as_str(), r[1].as_str()))
            .collect();
        assert_eq!(keys, vec![("b", "1"), ("a", "1"), ("a", "2")]);
        assert_eq!(deduplicate(deduped.clone()), deduped);
    }

    #[test]
    fn rename_ignores_blank_targets_and_unknown_columns() {
        let t = table(&["Old", "Other", "Keep"], &[&["1", "2", "3"]]);
        let m = mapping(&[("Old", "New"), ("Missing", "X"), ("Keep", "  ")]);
        let renamed = rename_columns(t.clone(), &m);
        assert_eq!(renamed.columns(), ["New", "Other", "Keep"]);
        assert_eq!(renamed.rows(), t.rows());
        assert_eq!(unmatched_mapping_keys(&t, &m), vec!["Missing".to_string()]);
    }

    #[test]
    fn rename_with_empty_target_leaves_name_unchanged() {
        let t = table(&["a", "b"], &[]);
        let renamed = rename_columns(t, &mapping(&[("a", "")]));
        assert_eq!(renamed.columns(), ["a", "b"]);
    }
}
