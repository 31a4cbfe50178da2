//! In-memory table representation.
//!
//! A [`Table`] is an ordered list of column names plus row-major string cells.
//! Every cell is kept as the exact text that was read; an empty string stands
//! for an absent value. Rows always have exactly one cell per column.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Column names plus a bounded number of leading rows, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table, padding short rows with empty cells and truncating
    /// long rows to the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn preview(&self, limit: usize) -> TablePreview {
        TablePreview {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
            total_rows: self.rows.len(),
        }
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.columns, self.rows)
    }

    pub(crate) fn with_columns(self, columns: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), self.columns.len());
        Self {
            columns,
            rows: self.rows,
        }
    }

    pub(crate) fn retain_rows(self, mut keep: impl FnMut(&[String]) -> bool) -> Self {
        let Self { columns, mut rows } = self;
        rows.retain(|row| keep(row));
        Self { columns, rows }
    }

    /// An empty table with the same header, used to collect a subset of rows.
    pub(crate) fn empty_like(&self) -> Self {
        Self::new(self.columns.clone())
    }
}

/// Turns a raw header row into usable column names.
///
/// Blank names become `Unnamed: {index}`; repeated names get `.1`, `.2`, ...
/// suffixes so every column stays addressable by name.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(raw.len());

    for (idx, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name
        };

        let mut candidate = base.clone();
        while taken.contains(&candidate) {
            let next = suffixes.entry(base.clone()).or_insert(0);
            *next += 1;
            candidate = format!("{base}.{next}");
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{Table, normalize_headers};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn from_rows_pads_and_truncates_to_header_width() {
        let table = Table::from_rows(
            strings(&["a", "b"]),
            vec![strings(&["1"]), strings(&["1", "2", "3"])],
        );
        assert_eq!(table.rows()[0], strings(&["1", ""]));
        assert_eq!(table.rows()[1], strings(&["1", "2"]));
    }

    #[test]
    fn normalize_headers_fills_blanks_and_suffixes_duplicates() {
        let names = normalize_headers(strings(&["id", "", "id", "id", " "]));
        assert_eq!(names, strings(&["id", "Unnamed: 1", "id.1", "id.2", "Unnamed: 4"]));
    }

    #[test]
    fn normalize_headers_skips_suffix_already_taken() {
        let names = normalize_headers(strings(&["a", "a.1", "a"]));
        assert_eq!(names, strings(&["a", "a.1", "a.2"]));
    }

    #[test]
    fn preview_limits_rows_but_reports_total() {
        let rows = (0..25).map(|i| vec![i.to_string()]).collect();
        let table = Table::from_rows(strings(&["n"]), rows);
        let preview = table.preview(10);
        assert_eq!(preview.rows.len(), 10);
        assert_eq!(preview.total_rows, 25);
        assert_eq!(preview.rows[9], strings(&["9"]));
    }
}
