use anyhow::{Context, Result};
use dataset_core::{deduplicate, drop_empty_rows, load, save};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::sibling_with_suffix;

pub fn run(path: &str, dedupe: bool, out: Option<&str>) -> Result<ExitCode> {
    let input = Path::new(path);
    let table = load(input).with_context(|| format!("Failed to load dataset: {}", path))?;
    let before = table.row_count();

    let mut cleaned = drop_empty_rows(table);
    let after_empty = cleaned.row_count();
    if dedupe {
        cleaned = deduplicate(cleaned);
    }

    let target = out
        .map(PathBuf::from)
        .unwrap_or_else(|| sibling_with_suffix(input, "_v1"));
    save(&cleaned, &target).with_context(|| format!("Failed to write {}", target.display()))?;

    println!(
        "Wrote {} ({} rows; {} empty and {} duplicate rows removed)",
        target.display(),
        cleaned.row_count(),
        before - after_empty,
        after_empty - cleaned.row_count()
    );
    Ok(ExitCode::from(0))
}
