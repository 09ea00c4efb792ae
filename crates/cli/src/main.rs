use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use collector::{Collector, RunOptions};
use models::ValidationStatus;

mod export;

#[derive(Parser)]
#[command(name = "moa", about = "Collects and unifies financial statements from multiple sources")]
struct Cli {
    /// Path to the settings file (defaults to ./settings.yaml)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a collection over the dated input folder
    Collect {
        /// Collect this date (YYYY-MM-DD) instead of the latest folder
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Only run these providers
        #[arg(short, long, value_delimiter = ',')]
        providers: Option<Vec<String>>,
        /// Run providers one at a time
        #[arg(long)]
        sequential: bool,
        /// Skip the CSV export
        #[arg(long)]
        no_export: bool,
    },
    /// List the providers and whether they are enabled
    Providers,
    /// Write empty manual-entry template sheets
    Template {
        /// Directory to write the template files into
        #[arg(default_value = "data/manual_template")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collector=info,cli=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = settings_loader::load_settings_or_default(cli.settings.as_ref())
        .context("Loading settings")?;

    match cli.command {
        Command::Collect {
            date,
            providers,
            sequential,
            no_export,
        } => {
            let collector = Collector::new(settings);
            let options = RunOptions {
                date,
                providers,
                sequential,
            };
            let output = collector.run(&options)?;

            println!(
                "Collected {} for {} ({} ms)",
                output.folder.display(),
                output.date,
                output.summary.elapsed_ms
            );
            for outcome in &output.summary.providers {
                if outcome.success {
                    println!(
                        "  {} ok: {} cash, {} positions, {} transactions",
                        outcome.provider, outcome.cash, outcome.positions, outcome.transactions
                    );
                } else {
                    println!(
                        "  {} FAILED: {}",
                        outcome.provider,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            println!("  total: {} records after dedup", output.summary.total_records);

            for (source, total) in &output.report.totals {
                println!("  {} total assets: {:.0}", source, total);
            }
            match output.report.status {
                ValidationStatus::Informational => {
                    println!("  cross-source check: ok");
                }
                ValidationStatus::Warning => {
                    for message in &output.report.warnings {
                        println!("  [WARN] {}", message);
                    }
                }
                ValidationStatus::Error => {
                    for message in &output.report.warnings {
                        println!("  [WARN] {}", message);
                    }
                    for message in &output.report.errors {
                        println!("  [ERROR] {}", message);
                    }
                }
            }

            if !no_export {
                let written = export::export_batch(
                    &output.batch,
                    &collector.settings().export_dir,
                    output.date,
                )?;
                for path in written {
                    println!("  wrote {}", path.display());
                }
            }
        }
        Command::Providers => {
            if settings.providers.is_empty() {
                println!("No providers configured");
            }
            for (name, provider) in &settings.providers {
                let state = if provider.enabled { "enabled" } else { "disabled" };
                println!("{:<12} {}", name, state);
            }
        }
        Command::Template { dir } => {
            let written = export::write_manual_template(&dir)?;
            for path in written {
                println!("wrote {}", path.display());
            }
        }
    }

    Ok(())
}
