//! The provider seam: one implementation per source of statements.
//!
//! A provider knows how to find its input file in the dated folder and how
//! to extract raw maps for each record kind. The default `collect` drives
//! locate, extract, normalize, and account resolution so concrete
//! providers only supply the extraction step.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use models::{ProviderSettings, RecordBatch, RecordKind, Settings};
use serde_json::Value;
use utils::accounts::{AliasTable, ResolutionStats, resolve_account};
use utils::files::find_latest_matching;

use crate::error::CollectError;
use crate::normalize::{normalize_cash, normalize_position, normalize_transaction};

pub const SNAPSHOT: &str = "snapshot";
pub const WORKBOOK: &str = "workbook";
pub const MANUAL: &str = "manual";

pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// The glob locating this provider's input for `kind`, or `None` when
    /// the provider does not produce that kind at all.
    fn pattern(&self, kind: RecordKind) -> Option<String>;

    /// Extracts raw key/value maps for one kind from the located file.
    fn extract_raw(
        &self,
        kind: RecordKind,
        path: &Path,
        date: NaiveDate,
    ) -> Result<Vec<Value>, CollectError>;

    /// Full pipeline for one provider: locate, extract, normalize, and
    /// resolve accounts against the alias table. Records whose label the
    /// table does not know are dropped and reported once, in aggregate.
    fn collect(
        &self,
        folder: &Path,
        date: NaiveDate,
        table: &AliasTable,
        collected_at: &str,
    ) -> Result<RecordBatch, CollectError> {
        let mut batch = RecordBatch::default();
        let mut stats = ResolutionStats::default();

        for kind in RecordKind::ALL {
            let Some(pattern) = self.pattern(kind) else {
                continue;
            };
            // A kind with no matching file yields nothing; only a file
            // that exists but cannot be read fails the provider.
            let path = match self.locate(folder, kind, &pattern) {
                Ok(path) => path,
                Err(err @ CollectError::MissingInput { .. }) => {
                    tracing::warn!(provider = self.name(), kind = %kind, %err, "Skipping kind");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let raw_rows = self.extract_raw(kind, &path, date)?;
            tracing::debug!(
                provider = self.name(),
                kind = %kind,
                rows = raw_rows.len(),
                file = %path.display(),
                "Extracted raw rows"
            );

            for raw in &raw_rows {
                match kind {
                    RecordKind::Cash => {
                        if let Some((label, mut record)) =
                            normalize_cash(raw, self.name(), date, collected_at)
                        {
                            match resolve_account(table, &label) {
                                Some(unified) => {
                                    record.account = unified;
                                    stats.record_resolved();
                                    batch.cash.push(record);
                                }
                                None => stats.record_excluded(&label),
                            }
                        }
                    }
                    RecordKind::Positions => {
                        if let Some((label, mut record)) =
                            normalize_position(raw, self.name(), date, collected_at)
                        {
                            match resolve_account(table, &label) {
                                Some(unified) => {
                                    record.account = unified;
                                    stats.record_resolved();
                                    batch.positions.push(record);
                                }
                                None => stats.record_excluded(&label),
                            }
                        }
                    }
                    RecordKind::Transactions => {
                        let (label, mut record) =
                            normalize_transaction(raw, self.name(), date, collected_at);
                        match label {
                            Some(label) => match resolve_account(table, &label) {
                                Some(unified) => {
                                    record.account = unified;
                                    stats.record_resolved();
                                    batch.transactions.push(record);
                                }
                                None => stats.record_excluded(&label),
                            },
                            // No account column in this source; the row is
                            // attributed to the provider itself.
                            None => {
                                stats.record_resolved();
                                batch.transactions.push(record);
                            }
                        }
                    }
                }
            }
        }

        stats.warn_if_excluded(self.name());
        Ok(batch)
    }

    fn locate(
        &self,
        folder: &Path,
        kind: RecordKind,
        pattern: &str,
    ) -> Result<PathBuf, CollectError> {
        find_latest_matching(folder, pattern)
            .map_err(|e| CollectError::StructuralParse {
                provider: self.name().to_string(),
                kind,
                detail: e.to_string(),
            })?
            .ok_or_else(|| CollectError::MissingInput {
                provider: self.name().to_string(),
                kind,
                pattern: pattern.to_string(),
            })
    }
}

fn configured_pattern(
    settings: &ProviderSettings,
    kind: RecordKind,
    default: &str,
) -> Option<String> {
    match settings.files.get(kind.as_str()) {
        Some(pattern) if pattern.is_empty() => None,
        Some(pattern) => Some(pattern.clone()),
        None => Some(default.to_string()),
    }
}

/// The MHTML snapshot of the aggregation web app. One file serves all
/// three kinds.
pub struct SnapshotProvider {
    settings: ProviderSettings,
}

impl SnapshotProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }
}

impl Provider for SnapshotProvider {
    fn name(&self) -> &str {
        SNAPSHOT
    }

    fn pattern(&self, kind: RecordKind) -> Option<String> {
        configured_pattern(&self.settings, kind, "*.mhtml")
    }

    fn extract_raw(
        &self,
        kind: RecordKind,
        path: &Path,
        _date: NaiveDate,
    ) -> Result<Vec<Value>, CollectError> {
        let extract = web_snapshot::SnapshotParser::new()
            .parse_file(path)
            .map_err(|e| CollectError::Mime(e.to_string()))?;
        Ok(match kind {
            RecordKind::Cash => extract.cash,
            RecordKind::Positions => extract.positions,
            RecordKind::Transactions => extract.transactions,
        })
    }
}

/// The brokerage workbook export. Carries balances and the ledger; no
/// holdings.
pub struct WorkbookProvider {
    settings: ProviderSettings,
}

impl WorkbookProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }
}

impl Provider for WorkbookProvider {
    fn name(&self) -> &str {
        WORKBOOK
    }

    fn pattern(&self, kind: RecordKind) -> Option<String> {
        match kind {
            RecordKind::Positions => None,
            _ => configured_pattern(&self.settings, kind, "*.xlsx"),
        }
    }

    fn extract_raw(
        &self,
        kind: RecordKind,
        path: &Path,
        date: NaiveDate,
    ) -> Result<Vec<Value>, CollectError> {
        let parser = if self.settings.recent_month_only {
            workbook::WorkbookParser::with_recent_month(date)
        } else {
            workbook::WorkbookParser::new()
        };
        let extract = parser
            .parse_file(path)
            .map_err(|e| CollectError::Workbook(e.to_string()))?;
        Ok(match kind {
            RecordKind::Cash => extract.cash,
            RecordKind::Positions => Vec::new(),
            RecordKind::Transactions => extract.transactions,
        })
    }
}

/// The hand-maintained workbook.
pub struct ManualProvider {
    settings: ProviderSettings,
}

impl ManualProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }
}

impl Provider for ManualProvider {
    fn name(&self) -> &str {
        MANUAL
    }

    fn pattern(&self, kind: RecordKind) -> Option<String> {
        configured_pattern(&self.settings, kind, "manual*.xlsx")
    }

    fn extract_raw(
        &self,
        kind: RecordKind,
        path: &Path,
        _date: NaiveDate,
    ) -> Result<Vec<Value>, CollectError> {
        let extract = manual_entry::ManualParser::new()
            .parse_file(path)
            .map_err(|e| CollectError::Workbook(e.to_string()))?;
        Ok(match kind {
            RecordKind::Cash => extract.cash,
            RecordKind::Positions => extract.positions,
            RecordKind::Transactions => extract.transactions,
        })
    }
}

/// Builds the enabled providers in name order, optionally narrowed to the
/// names in `filter`. A filter naming an unknown provider is an error; an
/// unknown name in the settings file is only a warning.
pub fn build_providers(
    settings: &Settings,
    filter: Option<&[String]>,
) -> Result<Vec<Box<dyn Provider>>, CollectError> {
    if let Some(names) = filter {
        for name in names {
            if !matches!(name.as_str(), SNAPSHOT | WORKBOOK | MANUAL) {
                return Err(CollectError::UnknownProvider(name.clone()));
            }
        }
    }

    let mut providers: Vec<Box<dyn Provider>> = Vec::new();
    for name in settings.enabled_providers() {
        if let Some(names) = filter {
            if !names.contains(&name) {
                continue;
            }
        }
        let provider_settings = settings.providers[&name].clone();
        match name.as_str() {
            SNAPSHOT => providers.push(Box::new(SnapshotProvider::new(provider_settings))),
            WORKBOOK => providers.push(Box::new(WorkbookProvider::new(provider_settings))),
            MANUAL => providers.push(Box::new(ManualProvider::new(provider_settings))),
            other => tracing::warn!(provider = other, "Unknown provider in settings, skipping"),
        }
    }
    Ok(providers)
}
