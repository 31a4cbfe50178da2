//! Splitting a table by its tag columns, and summarising tags.
//!
//! Two groupings live here and must not be conflated:
//! - [`partition_by_tag`] groups rows by the `(tag, tag type)` pair;
//! - [`summarize_tags`] groups rows by tag alone and reports the most
//!   frequent tag type within each tag.
//!
//! Both resolve a blank tag to [`UNTAGGED`] and a blank tag type to
//! [`UNKNOWN_TAG_TYPE`].

use crate::error::TableError;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_TAG_COLUMN: &str = "Tags";
pub const DEFAULT_TAG_TYPE_COLUMN: &str = "Tag Type";
pub const UNTAGGED: &str = "Untagged";
pub const UNKNOWN_TAG_TYPE: &str = "Unknown";

/// Names of the two row-classification columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagColumns {
    pub tag: String,
    pub tag_type: String,
}

impl Default for TagColumns {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG_COLUMN.to_string(),
            tag_type: DEFAULT_TAG_TYPE_COLUMN.to_string(),
        }
    }
}

impl TagColumns {
    /// Uses the configured names, falling back to the defaults for any that
    /// are unset or blank.
    pub fn from_config(tag: Option<&str>, tag_type: Option<&str>) -> Self {
        fn pick(value: Option<&str>, default: &str) -> String {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        }
        Self {
            tag: pick(tag, DEFAULT_TAG_COLUMN),
            tag_type: pick(tag_type, DEFAULT_TAG_TYPE_COLUMN),
        }
    }

    fn locate(&self, table: &Table) -> Result<(usize, usize), TableError> {
        let tag = table
            .column_index(&self.tag)
            .ok_or_else(|| TableError::MissingColumn(self.tag.clone()))?;
        let tag_type = table
            .column_index(&self.tag_type)
            .ok_or_else(|| TableError::MissingColumn(self.tag_type.clone()))?;
        Ok((tag, tag_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    pub tag: String,
    pub tag_type: String,
    pub table: Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub tag: String,
    pub tag_type: String,
    pub row_count: usize,
}

pub fn resolve_tag(value: &str) -> &str {
    resolve_or(value, UNTAGGED)
}

pub fn resolve_tag_type(value: &str) -> &str {
    resolve_or(value, UNKNOWN_TAG_TYPE)
}

fn resolve_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Groups rows by `(tag, tag type)`. Groups come back sorted by that pair so
/// numbering derived from their position is stable across runs. Each
/// sub-table keeps every column of the source, in source row order.
///
/// Fails with [`TableError::MissingColumn`] before grouping anything if
/// either column is absent.
pub fn partition_by_tag(table: &Table, columns: &TagColumns) -> Result<Vec<TagGroup>, TableError> {
    let (tag_idx, type_idx) = columns.locate(table)?;

    let mut groups: BTreeMap<(String, String), Table> = BTreeMap::new();
    for row in table.rows() {
        let key = (
            resolve_tag(&row[tag_idx]).to_string(),
            resolve_tag_type(&row[type_idx]).to_string(),
        );
        groups
            .entry(key)
            .or_insert_with(|| table.empty_like())
            .push_row(row.clone());
    }

    Ok(groups
        .into_iter()
        .map(|((tag, tag_type), table)| TagGroup {
            tag,
            tag_type,
            table,
        })
        .collect())
}

/// One entry per tag, sorted by tag. The reported tag type is the most
/// frequent one seen for that tag; ties go to the lexicographically
/// smallest.
pub fn summarize_tags(table: &Table, columns: &TagColumns) -> Result<Vec<TagSummary>, TableError> {
    let (tag_idx, type_idx) = columns.locate(table)?;

    let mut per_tag: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for row in table.rows() {
        let tag = resolve_tag(&row[tag_idx]);
        let tag_type = resolve_tag_type(&row[type_idx]);
        *per_tag.entry(tag).or_default().entry(tag_type).or_default() += 1;
    }

    Ok(per_tag
        .into_iter()
        .map(|(tag, types)| {
            let row_count = types.values().sum();
            let mut dominant = ("", 0usize);
            for (tag_type, count) in types {
                if count > dominant.1 {
                    dominant = (tag_type, count);
                }
            }
            TagSummary {
                tag: tag.to_string(),
                tag_type: dominant.0.to_string(),
                row_count,
            }
        })
        .collect())
}
