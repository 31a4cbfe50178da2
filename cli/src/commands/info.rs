use anyhow::{Context, Result};
use dataset_core::load;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use crate::OutputFormat;
use crate::output::{json::write_json, text::write_preview};

pub fn run(path: &str, rows: usize, format: OutputFormat) -> Result<ExitCode> {
    let table = load(Path::new(path)).with_context(|| format!("Failed to load dataset: {}", path))?;
    let preview = table.preview(rows);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&mut handle, &preview)?,
        OutputFormat::Text => {
            let filename = Path::new(path)
                .file_name()
                .map(|s| s.to_string_lossy())
                .unwrap_or_else(|| path.into());
            write_preview(&mut handle, &filename, &preview)?;
        }
    }
    handle.flush()?;
    Ok(ExitCode::from(0))
}
