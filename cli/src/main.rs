mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use dataset_core::TableError;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dataset-cli")]
#[command(about = "Inspect, clean and partition CSV/XLSX datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Show the columns and first rows of a dataset")]
    Info {
        #[arg(help = "Path to a .csv or .xlsx file")]
        path: String,
        #[arg(long, default_value_t = 10, help = "Number of rows to show")]
        rows: usize,
        #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Summarise rows per tag")]
    Tags {
        #[arg(help = "Path to a .csv or .xlsx file")]
        path: String,
        #[arg(long, help = "Column holding the tag (default: Tags)")]
        tag_column: Option<String>,
        #[arg(long, help = "Column holding the tag type (default: Tag Type)")]
        tag_type_column: Option<String>,
        #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
        format: OutputFormat,
    },
    #[command(about = "Drop empty rows and optionally duplicates, writing {base}_v1{ext}")]
    Clean {
        #[arg(help = "Path to a .csv or .xlsx file")]
        path: String,
        #[arg(long, help = "Also remove duplicate rows")]
        dedupe: bool,
        #[arg(long, value_name = "PATH", help = "Output path (default: next to the input)")]
        out: Option<String>,
    },
    #[command(about = "Write one file per (tag, tag type) pair")]
    Partition {
        #[arg(help = "Path to a .csv or .xlsx file")]
        path: String,
        #[arg(long, value_name = "DIR", help = "Output directory (default: the input's directory)")]
        out_dir: Option<String>,
        #[arg(long, help = "Column holding the tag (default: Tags)")]
        tag_column: Option<String>,
        #[arg(long, help = "Column holding the tag type (default: Tag Type)")]
        tag_type_column: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { path, rows, format } => commands::info::run(&path, rows, format),
        Commands::Tags {
            path,
            tag_column,
            tag_type_column,
            format,
        } => commands::tags::run(&path, tag_column.as_deref(), tag_type_column.as_deref(), format),
        Commands::Clean { path, dedupe, out } => commands::clean::run(&path, dedupe, out.as_deref()),
        Commands::Partition {
            path,
            out_dir,
            tag_column,
            tag_type_column,
        } => commands::partition::run(
            &path,
            out_dir.as_deref(),
            tag_column.as_deref(),
            tag_type_column.as_deref(),
        ),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

/// 2 for bad input data, 3 for failures writing output.
fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    let write_failure = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<TableError>(),
            Some(TableError::Write { .. })
        ) || cause.is::<std::io::Error>()
    });
    if write_failure {
        ExitCode::from(3)
    } else {
        ExitCode::from(2)
    }
}
