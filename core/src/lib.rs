//! Dataset Core: the tabular transform engine behind dataset projects.
//!
//! This crate provides:
//! - Loading `.csv` and `.xlsx` files into an all-string [`Table`]
//! - Cleaning (dropping empty rows, removing duplicate rows)
//! - Renaming columns from an old-name to new-name mapping
//! - Partitioning rows by tag / tag type, and summarising tags
//! - Writing tables back out without reformatting any cell
//!
//! # Quick Start
//!
//! ```ignore
//! use dataset_core::{deduplicate, drop_empty_rows, load, save};
//!
//! let table = load(std::path::Path::new("upload.csv"))?;
//! let cleaned = deduplicate(drop_empty_rows(table));
//! save(&cleaned, std::path::Path::new("upload_v1.csv"))?;
//! ```

mod addressing;
mod container;
mod csv_codec;
mod error;
pub mod error_codes;
mod format;
mod naming;
mod partition;
mod table;
mod transform;
mod xlsx_reader;
mod xlsx_writer;

pub use container::ContainerError;
pub use error::TableError;
pub use format::{TableFormat, load, load_header_only, save, save_as};
pub use naming::{partition_file_name, sanitize_file_name};
pub use partition::{
    DEFAULT_TAG_COLUMN, DEFAULT_TAG_TYPE_COLUMN, TagColumns, TagGroup, TagSummary,
    UNKNOWN_TAG_TYPE, UNTAGGED, partition_by_tag, resolve_tag, resolve_tag_type, summarize_tags,
};
pub use table::{Table, TablePreview, normalize_headers};
pub use transform::{deduplicate, drop_empty_rows, rename_columns, unmatched_mapping_keys};
pub use xlsx_reader::XlsxReadError;
