//! CSV export of one run's integrated batch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use models::RecordBatch;
use serde::Serialize;

/// Writes cash.csv, positions.csv, and transactions.csv into a dated
/// subdirectory of `export_dir` and returns the paths written.
pub fn export_batch(
    batch: &RecordBatch,
    export_dir: &Path,
    date: NaiveDate,
) -> Result<Vec<PathBuf>> {
    let target = export_dir.join(date.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&target)
        .with_context(|| format!("Creating export dir: {}", target.display()))?;

    let mut written = Vec::new();
    written.push(write_csv(&target.join("cash.csv"), &batch.cash)?);
    written.push(write_csv(&target.join("positions.csv"), &batch.positions)?);
    written.push(write_csv(
        &target.join("transactions.csv"),
        &batch.transactions,
    )?);
    Ok(written)
}

/// Writes the three empty manual-entry sheets with their expected headers.
/// The parenthesized hints are stripped again on the way back in.
pub fn write_manual_template(dir: &Path) -> Result<Vec<PathBuf>> {
    const SHEETS: [(&str, &[&str]); 3] = [
        (
            "cash.csv",
            &[
                "date (YYYY-MM-DD)",
                "account",
                "balance (KRW)",
                "currency",
                "category",
            ],
        ),
        (
            "position.csv",
            &[
                "name",
                "ticker",
                "account",
                "quantity",
                "average_price (KRW)",
                "currency",
            ],
        ),
        (
            "transaction.csv",
            &[
                "date (YYYY-MM-DD)",
                "time (HH:MM:SS)",
                "account",
                "description",
                "amount (KRW)",
                "currency",
            ],
        ),
    ];

    fs::create_dir_all(dir).with_context(|| format!("Creating {}", dir.display()))?;
    let mut written = Vec::new();
    for (name, headers) in SHEETS {
        let path = dir.join(name);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Creating {}", path.display()))?;
        writer
            .write_record(headers)
            .with_context(|| format!("Writing {}", path.display()))?;
        writer.flush()?;
        written.push(path);
    }
    Ok(written)
}

fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<PathBuf> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Creating {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Writing {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing {}", path.display()))?;
    Ok(path.to_path_buf())
}
