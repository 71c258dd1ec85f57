use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use releve_core::{ClassifiedTransaction, Direction};
use releve_finance::{AggregateOptions, Granularity, ParseReport, PeriodAggregator, Pipeline};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod state;
mod table;

use config::LoadedConfig;

#[derive(Parser, Debug)]
#[command(
    name = "releve",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RELEVE_BUILD_SHA"), ")"),
    about = "Bank statement text to categorized cash-flow summaries"
)]
struct Cli {
    /// Config file (default: $RELEVE_CONFIG, then ~/.releve/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse extracted statement text files and print what was recovered
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print a plain-text table instead of JSON
        #[arg(long)]
        table: bool,
    },

    /// Parse files and print a period summary
    Summary {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Grouping preset (see `releve presets`)
        #[arg(long)]
        preset: Option<String>,

        /// Months to keep, counting back from the anchor date (0 = all)
        #[arg(long)]
        months: Option<u32>,

        /// daily, weekly or monthly
        #[arg(long)]
        granularity: Option<Granularity>,

        /// Anchor date (YYYY-MM-DD); defaults to the latest transaction
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Categorize a single label
    Classify {
        description: String,

        /// IN or OUT
        #[arg(long, default_value = "OUT")]
        direction: Direction,
    },

    /// List grouping presets
    Presets,

    /// Config file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    #[serde(flatten)]
    report: &'a ParseReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_flag = cli.config.as_deref();

    match cli.command {
        Command::Parse { files, table } => {
            let loaded = config::load_config(config_flag)?;
            let pipeline = build_pipeline(&loaded)?;
            let reports = parse_files(pipeline, files).await?;
            if table {
                for (path, report) in &reports {
                    print!("{}", table::render_report(&path.display().to_string(), report));
                }
            } else {
                let out: Vec<FileReport<'_>> = reports
                    .iter()
                    .map(|(path, report)| FileReport {
                        file: path.display().to_string(),
                        report,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
        }

        Command::Summary {
            files,
            preset,
            months,
            granularity,
            as_of,
        } => {
            let loaded = config::load_config(config_flag)?;
            let pipeline = build_pipeline(&loaded)?;
            let reports = parse_files(pipeline, files).await?;
            let txns = merge_transactions(reports.into_iter().map(|(_, report)| report));

            let report_cfg = &loaded.config.report;
            let options = AggregateOptions {
                preset: Some(preset.unwrap_or_else(|| report_cfg.preset.clone())),
                months: Some(months.unwrap_or(report_cfg.months)),
                as_of,
            };
            let catalog = loaded.presets();
            let summary = PeriodAggregator::new(&catalog).aggregate(&txns, &options);
            let rendered = summary.render(granularity.unwrap_or(report_cfg.granularity));
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }

        Command::Classify {
            description,
            direction,
        } => {
            let loaded = config::load_config(config_flag)?;
            let rules = loaded.rule_store()?.snapshot();
            let result = rules.classify(&description, direction);
            match result.rule_index {
                Some(index) => println!("{} (rule {})", result.category, index + 1),
                None => println!("{} (default)", result.category),
            }
        }

        Command::Presets => {
            let loaded = config::load_config(config_flag)?;
            for info in loaded.presets().infos() {
                println!("{:<12} {}", info.name, info.label);
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(config_flag)?,
            ConfigCommand::Show => config::show_config(config_flag)?,
        },
    }

    Ok(())
}

fn build_pipeline(loaded: &LoadedConfig) -> Result<Arc<Pipeline>> {
    let rules = loaded.rule_store()?;
    Ok(Arc::new(Pipeline::new(loaded.config.ingest.clone(), Arc::new(rules))))
}

/// Parse every file on the blocking pool, keeping the input order.
async fn parse_files(pipeline: Arc<Pipeline>, files: Vec<PathBuf>) -> Result<Vec<(PathBuf, ParseReport)>> {
    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        if !path.exists() {
            bail!("statement not found: {}", path.display());
        }
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::task::spawn_blocking(move || parse_file(&pipeline, path)));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await.context("parse task failed")??);
    }
    info!(files = reports.len(), "parsed statements");
    Ok(reports)
}

fn parse_file(pipeline: &Pipeline, path: PathBuf) -> Result<(PathBuf, ParseReport)> {
    let text = state::read_text(&path)?;
    debug!(path = %path.display(), bytes = text.len(), "parsing");
    let report = pipeline.parse_document(&text);
    Ok((path, report))
}

/// All transactions in date order; ties keep file order.
fn merge_transactions(reports: impl Iterator<Item = ParseReport>) -> Vec<ClassifiedTransaction> {
    let mut txns: Vec<ClassifiedTransaction> = reports.flat_map(|r| r.transactions).collect();
    txns.sort_by_key(ClassifiedTransaction::period_date);
    txns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_flags_parse() {
        let cli = Cli::try_parse_from([
            "releve",
            "summary",
            "a.txt",
            "b.txt",
            "--granularity",
            "weekly",
            "--as-of",
            "2024-03-31",
            "--months",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Summary {
                files,
                granularity,
                as_of,
                months,
                preset,
            } => {
                assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
                assert_eq!(granularity, Some(Granularity::Weekly));
                assert_eq!(as_of, NaiveDate::from_ymd_opt(2024, 3, 31));
                assert_eq!(months, Some(3));
                assert_eq!(preset, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_classify_direction_flag() {
        let cli = Cli::try_parse_from(["releve", "classify", "REMISE CB", "--direction", "in"]).unwrap();
        assert!(matches!(cli.command, Command::Classify { direction: Direction::In, .. }));
        assert!(Cli::try_parse_from(["releve", "parse"]).is_err());
    }

    #[test]
    fn test_merged_transactions_are_date_ordered() {
        let pipeline = Pipeline::default();
        let late = pipeline.parse_document("10.03 10.03.24 PRLV EDF 80,00\n");
        let early = pipeline.parse_document("02.03 02.03.24 VIR RECU ACME 120,00\n");
        let txns = merge_transactions([late, early].into_iter());
        let days: Vec<_> = txns.iter().map(|t| t.date.to_string()).collect();
        assert_eq!(days, vec!["2024-03-02", "2024-03-10"]);
    }
}
