//! Stable error codes surfaced to callers alongside human-readable messages.

pub const UNSUPPORTED_FORMAT: &str = "TABLE_UNSUPPORTED_FORMAT";
pub const READ_FAILURE: &str = "TABLE_READ_FAILURE";
pub const WRITE_FAILURE: &str = "TABLE_WRITE_FAILURE";
pub const MISSING_COLUMN: &str = "TABLE_MISSING_COLUMN";
pub const TOO_MANY_COLUMNS: &str = "TABLE_TOO_MANY_COLUMNS";

pub const CONTAINER_IO: &str = "XLSX_CONTAINER_IO";
pub const CONTAINER_ZIP: &str = "XLSX_CONTAINER_ZIP";
pub const CONTAINER_NOT_ZIP: &str = "XLSX_NOT_ZIP";
pub const CONTAINER_NOT_OPC: &str = "XLSX_NOT_OPC";
pub const CONTAINER_PART_TOO_LARGE: &str = "XLSX_PART_TOO_LARGE";
pub const CONTAINER_TOTAL_TOO_LARGE: &str = "XLSX_TOTAL_TOO_LARGE";
