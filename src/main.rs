mod batch;
mod config;
mod debug_log;
mod error;
mod output;
mod parser;
mod source;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::batch::BatchReport;
use crate::config::{Overrides, Settings};
use crate::debug_log::DebugLog;
use crate::output::RowWriter;
use crate::parser::events::{Observer, Silent, Trace};
use crate::parser::lines::{Classifier, LineKind};

#[derive(Parser)]
#[command(name = "clin_extract", about = "Extract contract line items from PDF schedules into CSV")]
struct Cli {
    /// Settings file (default: ./clin_extract.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every contract in a directory into one CSV
    Extract {
        /// Input directory (default: Contracts)
        dir: Option<PathBuf>,
        /// CSV destination (default: output.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the extraction trace to the debug log
        #[arg(long)]
        debug: bool,
        /// Debug log path (implies --debug)
        #[arg(long)]
        debug_log: Option<PathBuf>,
        /// File extensions to process, repeatable (default: pdf)
        #[arg(long = "ext")]
        extensions: Vec<String>,
        /// Worker threads (0 = one per core)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Show what would be extracted from a single file
    Inspect {
        file: PathBuf,
        /// Also print every line with its classification
        #[arg(long)]
        lines: bool,
        /// Print the record as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Extract {
            dir,
            output,
            debug,
            debug_log,
            extensions,
            jobs,
        } => {
            let settings = settings.apply(Overrides {
                input_dir: dir,
                output,
                debug,
                debug_log,
                extensions,
                jobs,
            });
            extract(&settings)
        }
        Commands::Inspect { file, lines, json } => inspect(&file, lines, json),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn extract(settings: &Settings) -> anyhow::Result<()> {
    info!(settings = ?settings, "Starting contract extraction");

    let log = if settings.debug {
        Some(DebugLog::create(&settings.debug_log)?)
    } else {
        None
    };
    let mut writer = RowWriter::create(&settings.output)?;

    let files = batch::discover(settings)?;
    let report = if files.is_empty() {
        println!("No eligible files in {}.", settings.input_dir.display());
        BatchReport::default()
    } else {
        println!("Processing {} files...", files.len());
        let pb = progress_bar(files.len());
        let report = batch::run(settings, &files, log.as_ref(), &pb)?;
        pb.finish_and_clear();
        report
    };

    let observer: &dyn Observer = match &log {
        Some(log) => log,
        None => &Silent,
    };
    for record in &report.records {
        writer.write_document(record, observer)?;
    }
    let rows = writer.rows_written();
    writer.finish()?;
    if let Some(log) = &log {
        log.flush()?;
    }

    println!(
        "Extracted {} line items from {} documents ({} with a schedule); {} rows written to {}.",
        report.line_items(),
        report.records.len(),
        report.documents_with_items(),
        rows,
        settings.output.display(),
    );

    if !report.failures.is_empty() {
        println!("\n--- Failed files ---");
        for f in &report.failures {
            println!("  {}: {}", f.path.display(), f.error);
        }
        bail!("{} of {} files failed", report.failures.len(), files.len());
    }
    Ok(())
}

fn inspect(file: &Path, show_lines: bool, json: bool) -> anyhow::Result<()> {
    let pages = source::load_pages(file)?;

    if show_lines {
        for (n, page) in pages.iter().enumerate() {
            println!("=== page {} ===", n + 1);
            let Some(text) = page else {
                println!("  [no text]");
                continue;
            };
            let lines: Vec<&str> = text.split('\n').collect();
            for (i, kind) in Classifier::new(&lines) {
                let tag = match kind {
                    LineKind::Preamble => " ",
                    LineKind::Trigger => "T",
                    LineKind::PageBreak => "~",
                    LineKind::Opening(_) => "*",
                    LineKind::Other => ".",
                };
                println!("{:>4} {} {}", i + 1, tag, lines[i]);
            }
        }
        println!();
    }

    let record = parser::process_document(&batch::file_name(file), &pages, &Trace);

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("File:       {}", record.source_file);
    println!("PR Number:  {}", record.fields.requisition_number());
    println!("PR Title:   {}", record.fields.pr_title());
    if record.line_items.is_empty() {
        println!("\nNo line items found.");
        return Ok(());
    }

    println!(
        "\n{:<8} | {:<32} | {:>5} | {:<4} | {:>14} | {:>14} | {:<5}",
        "Code", "Title", "Qty", "Unit", "Unit Price", "Amount", "Flags"
    );
    println!("{}", "-".repeat(100));
    for item in &record.line_items {
        let flags: Vec<&str> = item.flags.iter().map(|f| f.literal()).collect();
        println!(
            "{:<8} | {:<32} | {:>5} | {:<4} | {:>14} | {:>14} | {:<5}",
            item.code.source_code(),
            truncate(&item.title, 32),
            item.quantity.to_string(),
            item.unit.to_string(),
            item.unit_price.to_string(),
            item.amount.to_string(),
            flags.join(","),
        );
    }
    println!("\n{} line items", record.line_items.len());
    Ok(())
}

fn progress_bar(len: usize) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
