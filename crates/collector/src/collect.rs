//! Run orchestration: resolve the dated input folder, fan out over the
//! enabled providers, merge, dedup, and validate.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};
use models::{ProviderOutcome, RecordBatch, RunSummary, Settings, ValidationReport};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::aggregate::aggregate;
use crate::provider::{Provider, build_providers};
use crate::validate::{source_totals, validate_cross_source};

const MAX_WORKERS: usize = 5;

#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Collect this date's folder instead of the most recent one.
    pub date: Option<NaiveDate>,
    /// Narrow the run to these providers.
    pub providers: Option<Vec<String>>,
    /// Run providers one after another instead of on the worker pool.
    pub sequential: bool,
}

/// Everything one run produces.
#[derive(Debug)]
pub struct RunOutput {
    pub date: NaiveDate,
    pub folder: PathBuf,
    pub batch: RecordBatch,
    pub summary: RunSummary,
    pub report: ValidationReport,
}

pub struct Collector {
    settings: Settings,
}

impl Collector {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Picks the folder to collect from. An explicit date must name an
    /// existing dated folder; otherwise the input dir itself counts when
    /// date-named, and the newest dated subfolder is the fallback.
    pub fn resolve_input_folder(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<(NaiveDate, PathBuf)> {
        let input_dir = &self.settings.input_dir;

        if let Some(wanted) = date {
            let mut found = None;
            if input_dir.exists() {
                for entry in std::fs::read_dir(input_dir)? {
                    let path = entry?.path();
                    if path.is_dir() && utils::dates::extract_folder_date(&path) == Some(wanted) {
                        found = Some(path);
                        break;
                    }
                }
            }
            return found.map(|path| (wanted, path)).ok_or_else(|| {
                anyhow!(
                    "No input folder for {} under {}",
                    wanted,
                    input_dir.display()
                )
            });
        }

        if let Some(date) = utils::dates::extract_folder_date(input_dir) {
            return Ok((date, input_dir.clone()));
        }

        utils::dates::latest_dated_folder(input_dir)?
            .ok_or_else(|| anyhow!("No dated input folder under {}", input_dir.display()))
    }

    /// Runs the whole pipeline and returns the integrated batch together
    /// with the per-provider summary and the cross-source report.
    pub fn run(&self, options: &RunOptions) -> Result<RunOutput> {
        let started = Instant::now();
        let (date, folder) = self.resolve_input_folder(options.date)?;
        let collected_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        tracing::info!(date = %date, folder = %folder.display(), "Collecting");

        let providers = build_providers(&self.settings, options.providers.as_deref())?;
        if providers.is_empty() {
            tracing::warn!("No providers enabled, nothing to collect");
        }

        let table = self.settings.alias_table();
        let run_one = |provider: &Box<dyn Provider>| -> (ProviderOutcome, RecordBatch) {
            match provider.collect(&folder, date, &table, &collected_at) {
                Ok(batch) => {
                    tracing::info!(
                        provider = provider.name(),
                        records = batch.total(),
                        "Provider finished"
                    );
                    (
                        ProviderOutcome {
                            provider: provider.name().to_string(),
                            success: true,
                            cash: batch.cash.len(),
                            positions: batch.positions.len(),
                            transactions: batch.transactions.len(),
                            error: None,
                        },
                        batch,
                    )
                }
                Err(err) => {
                    tracing::error!(provider = provider.name(), %err, "Provider failed");
                    (
                        ProviderOutcome {
                            provider: provider.name().to_string(),
                            success: false,
                            cash: 0,
                            positions: 0,
                            transactions: 0,
                            error: Some(err.to_string()),
                        },
                        RecordBatch::default(),
                    )
                }
            }
        };

        let results: Vec<(ProviderOutcome, RecordBatch)> = if options.sequential {
            providers.iter().map(run_one).collect()
        } else {
            let workers = providers.len().clamp(1, MAX_WORKERS);
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| anyhow!("Building worker pool: {}", e))?;
            pool.install(|| providers.par_iter().map(run_one).collect())
        };

        let mut batch = RecordBatch::default();
        let mut summary = RunSummary::default();
        for (outcome, provider_batch) in results {
            summary.providers.push(outcome);
            batch.merge(provider_batch);
        }

        // Balances and holdings describe the folder's day, whatever the
        // source wrote. Ledger dates stay untouched.
        for record in &mut batch.cash {
            record.date = date;
        }
        for record in &mut batch.positions {
            record.date = date;
        }

        aggregate(&mut batch);
        summary.total_records = batch.total();
        summary.elapsed_ms = started.elapsed().as_millis();

        let report = validate_cross_source(&source_totals(&batch), &self.settings.validation);

        Ok(RunOutput {
            date,
            folder,
            batch,
            summary,
            report,
        })
    }
}
