use anyhow::Result;
use dataset_core::{TablePreview, TagSummary};
use std::io::Write;

pub fn write_preview<W: Write>(w: &mut W, name: &str, preview: &TablePreview) -> Result<()> {
    writeln!(w, "Dataset: {}", name)?;
    writeln!(w, "Columns ({}): {}", preview.columns.len(), preview.columns.join(", "))?;
    writeln!(w, "Rows: {}", preview.total_rows)?;
    if preview.rows.is_empty() {
        return Ok(());
    }

    writeln!(w)?;
    let widths = column_widths(preview);
    write_row(w, &preview.columns, &widths)?;
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(w, "{}", rule.join("-+-"))?;
    for row in &preview.rows {
        write_row(w, row, &widths)?;
    }
    if preview.total_rows > preview.rows.len() {
        writeln!(w, "... {} more rows", preview.total_rows - preview.rows.len())?;
    }
    Ok(())
}

pub fn write_tag_summary<W: Write>(w: &mut W, summary: &[TagSummary]) -> Result<()> {
    if summary.is_empty() {
        writeln!(w, "No rows.")?;
        return Ok(());
    }
    let tag_width = summary.iter().map(|s| s.tag.chars().count()).max().unwrap_or(0).max(3);
    let type_width = summary
        .iter()
        .map(|s| s.tag_type.chars().count())
        .max()
        .unwrap_or(0)
        .max(8);
    writeln!(w, "{:<tag_width$}  {:<type_width$}  rows", "tag", "tag type")?;
    for entry in summary {
        writeln!(
            w,
            "{:<tag_width$}  {:<type_width$}  {}",
            entry.tag, entry.tag_type, entry.row_count
        )?;
    }
    Ok(())
}

fn column_widths(preview: &TablePreview) -> Vec<usize> {
    let mut widths: Vec<usize> = preview.columns.iter().map(|c| c.chars().count()).collect();
    for row in &preview.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn write_row<W: Write>(w: &mut W, cells: &[String], widths: &[usize]) -> Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    writeln!(w, "{}", padded.join(" | ").trim_end())?;
    Ok(())
}
