//! Process command - extract fields from a single receipt file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use rcpt_core::ExtractionResult;

use super::{build_strategy, load_config};
use crate::input::read_receipt_text;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Extraction strategy (rules, layout, tagged, llm); overrides the config file
    #[arg(short, long)]
    strategy: Option<String>,

    /// Report fields that fell back to their defaults
    #[arg(long)]
    validate: bool,

    /// Include the receipt text in JSON output
    #[arg(long)]
    include_text: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(name) = &args.strategy {
        config.extraction = config.extraction.with_strategy(name)?;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    pb.set_message("Reading receipt...");
    pb.set_position(10);
    let text = read_receipt_text(&args.input)?;

    pb.set_message(format!("Extracting with {} strategy...", config.extraction.strategy));
    pb.set_position(40);

    let receipt_text = text.clone();
    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<ExtractionResult> {
        let strategy = build_strategy(&config)?;
        Ok(strategy.extract(&receipt_text))
    })
    .await??;

    pb.set_position(100);
    pb.finish_and_clear();

    if args.validate {
        let missing = result.missing_fields();
        if !missing.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for field in &missing {
                eprintln!("  - {} not found", field);
            }
        }
    }

    let raw_text = args.include_text.then_some(text.as_str());
    let output = format_result(&result, args.format, raw_text)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render a result; `raw_text` is only emitted by the JSON format.
pub fn format_result(
    result: &ExtractionResult,
    format: OutputFormat,
    raw_text: Option<&str>,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(result)?;
            if let Some(text) = raw_text {
                value["raw_text"] = serde_json::Value::String(text.to_string());
            }
            Ok(serde_json::to_string_pretty(&value)?)
        }
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn joined_dates(result: &ExtractionResult) -> String {
    result
        .all_dates()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["merchant_name", "total_amount", "purchased_at", "all_dates"])?;
    let total = result.total_amount().to_string();
    let purchased_at = result.purchased_at().map(|d| d.to_string()).unwrap_or_default();
    let dates = joined_dates(result);
    wtr.write_record([result.merchant_name(), total.as_str(), purchased_at.as_str(), dates.as_str()])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Merchant: {}\n", result.merchant_name()));
    output.push_str(&format!("Total:    {}\n", result.total_amount()));
    match result.purchased_at() {
        Some(date) => output.push_str(&format!("Date:     {}\n", date)),
        None => output.push_str("Date:     not found\n"),
    }
    if result.all_dates().len() > 1 {
        output.push_str(&format!("All dates: {}\n", joined_dates(result).replace(';', ", ")));
    }

    output
}
