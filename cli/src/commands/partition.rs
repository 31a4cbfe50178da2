use anyhow::{Context, Result, anyhow, bail};
use dataset_core::{TableFormat, TagColumns, load, partition_by_tag, partition_file_name, save};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run(
    path: &str,
    out_dir: Option<&str>,
    tag_column: Option<&str>,
    tag_type_column: Option<&str>,
) -> Result<ExitCode> {
    let input = Path::new(path);
    let extension = TableFormat::from_path(input)?.extension();
    let table = load(input).with_context(|| format!("Failed to load dataset: {}", path))?;
    let columns = TagColumns::from_config(tag_column, tag_type_column);
    let groups = partition_by_tag(&table, &columns)
        .with_context(|| format!("Failed to partition {}", path))?;

    let dir = match out_dir {
        Some(dir) => PathBuf::from(dir),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let mut targets = Vec::with_capacity(groups.len());
    for (i, group) in groups.iter().enumerate() {
        let name = partition_file_name(&group.tag, &group.tag_type, i + 1, extension)
            .ok_or_else(|| {
                anyhow!("Tag '{}' / '{}' gives no usable file name", group.tag, group.tag_type)
            })?;
        let target = dir.join(name);
        if target.exists() {
            bail!("Refusing to overwrite existing file: {}", target.display());
        }
        targets.push(target);
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    for (i, (group, target)) in groups.iter().zip(&targets).enumerate() {
        save(&group.table, target)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        println!(
            "v2.{}  {} / {}  {} rows  {}",
            i + 1,
            group.tag,
            group.tag_type,
            group.table.row_count(),
            target.display()
        );
    }
    Ok(ExitCode::from(0))
}
