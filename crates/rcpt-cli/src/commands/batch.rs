//! Batch processing command for multiple receipt files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use rcpt_core::ExtractionResult;

use super::process::{format_result, OutputFormat};
use super::{build_strategy, load_config};
use crate::input::{is_supported, read_receipt_text};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching receipt files
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extraction strategy (rules, layout, tagged, llm); overrides the config file
    #[arg(short, long)]
    strategy: Option<String>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome for one file.
struct BatchEntry {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(name) = &args.strategy {
        config.extraction = config.extraction.with_strategy(name)?;
    }

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let continue_on_error = args.continue_on_error;
    let pb = overall_pb.clone();
    let entries = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<BatchEntry>> {
        let strategy = build_strategy(&config)?;
        let mut entries = Vec::with_capacity(files.len());

        for path in files {
            let file_start = Instant::now();
            let outcome = read_receipt_text(&path).map(|text| strategy.extract(&text));
            let processing_time_ms = file_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => entries.push(BatchEntry {
                    path,
                    result: Some(result),
                    error: None,
                    processing_time_ms,
                }),
                Err(e) => {
                    let error_msg = e.to_string();
                    if !continue_on_error {
                        error!("Failed to process {}: {}", path.display(), error_msg);
                        anyhow::bail!("Processing failed: {}", error_msg);
                    }
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    entries.push(BatchEntry {
                        path,
                        result: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                }
            }

            pb.inc(1);
        }

        Ok(entries)
    })
    .await??;

    overall_pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        let mut taken = HashSet::new();
        for entry in &entries {
            let Some(result) = &entry.result else {
                continue;
            };
            let output_name = output_file_name(&entry.path, args.format.extension(), &mut taken);
            let output_path = output_dir.join(output_name);

            fs::write(&output_path, format_result(result, args.format, None)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &entries)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<&BatchEntry> = entries.iter().filter(|e| e.error.is_some()).collect();
    let successful = entries.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        entries.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for entry in &failed {
            println!(
                "  - {}: {}",
                entry.path.display(),
                entry.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// `<stem>.<ext>`, or `<file name>.<ext>` when another input in the
/// batch already took that name (`a.txt` and `a.pdf`).
fn output_file_name(path: &Path, extension: &str, taken: &mut HashSet<String>) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("receipt");
    let mut name = format!("{}.{}", stem, extension);

    if taken.contains(&name) {
        let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or(stem);
        name = format!("{}.{}", file_name, extension);
        let mut n = 2;
        while taken.contains(&name) {
            name = format!("{}-{}.{}", file_name, n, extension);
            n += 1;
        }
        warn!("Output name for {} collides, writing {}", path.display(), name);
    }

    taken.insert(name.clone());
    name
}

fn write_summary(path: &Path, entries: &[BatchEntry]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "merchant_name",
        "total_amount",
        "purchased_at",
        "missing_fields",
        "processing_time_ms",
        "error",
    ])?;

    for entry in entries {
        let filename = entry
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time_ms = entry.processing_time_ms.to_string();

        if let Some(result) = &entry.result {
            let total = result.total_amount().to_string();
            let purchased_at = result
                .purchased_at()
                .map(|d| d.to_string())
                .unwrap_or_default();
            let missing = result.missing_fields().join(";");

            wtr.write_record([
                filename,
                "success",
                result.merchant_name(),
                total.as_str(),
                purchased_at.as_str(),
                missing.as_str(),
                time_ms.as_str(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                time_ms.as_str(),
                entry.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
