use anyhow::{Context, Result};
use dataset_core::{TagColumns, load, summarize_tags};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use crate::OutputFormat;
use crate::output::{json::write_json, text::write_tag_summary};

pub fn run(
    path: &str,
    tag_column: Option<&str>,
    tag_type_column: Option<&str>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let table = load(Path::new(path)).with_context(|| format!("Failed to load dataset: {}", path))?;
    let columns = TagColumns::from_config(tag_column, tag_type_column);
    let summary = summarize_tags(&table, &columns)
        .with_context(|| format!("Failed to summarise tags in {}", path))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&mut handle, &summary)?,
        OutputFormat::Text => write_tag_summary(&mut handle, &summary)?,
    }
    handle.flush()?;
    Ok(ExitCode::from(0))
}
