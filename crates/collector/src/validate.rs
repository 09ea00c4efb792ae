//! Cross-source sanity check on total assets.
//!
//! Each source's total is its cash balances plus the cost value of its
//! holdings. Every other source is compared against the first-enumerated
//! one; the relative difference lands in one of three severity bands.
//! Detection only: the report never blocks the run.

use models::{
    RecordBatch, SourceComparison, ValidationReport, ValidationSettings, ValidationStatus,
};

/// Totals per source, in first-appearance order across cash then holdings.
pub fn source_totals(batch: &RecordBatch) -> Vec<(String, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: Vec<f64> = Vec::new();

    let mut add = |source: &str, value: f64| {
        match order.iter().position(|s| s == source) {
            Some(idx) => totals[idx] += value,
            None => {
                order.push(source.to_string());
                totals.push(value);
            }
        }
    };

    for record in &batch.cash {
        add(&record.source, record.balance);
    }
    for record in &batch.positions {
        add(&record.source, record.quantity * record.average_price);
    }

    order.into_iter().zip(totals).collect()
}

/// Compares every source total against the first one and grades each gap.
pub fn validate_cross_source(
    totals: &[(String, f64)],
    settings: &ValidationSettings,
) -> ValidationReport {
    let mut report = ValidationReport {
        status: ValidationStatus::Informational,
        totals: totals.to_vec(),
        comparisons: Vec::new(),
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    let Some((base_name, base_total)) = totals.first().cloned() else {
        return report;
    };

    for (other_name, other_total) in totals.iter().skip(1) {
        let absolute_diff = (other_total - base_total).abs();
        let relative_diff = if base_total.abs() < f64::EPSILON {
            if absolute_diff < f64::EPSILON { 0.0 } else { f64::INFINITY }
        } else {
            absolute_diff / base_total.abs()
        };

        let status = if relative_diff <= settings.warn_threshold {
            ValidationStatus::Informational
        } else if relative_diff <= settings.error_threshold {
            ValidationStatus::Warning
        } else {
            ValidationStatus::Error
        };

        let message = format!(
            "{} total {:.0} differs from {} total {:.0} by {:.1}%",
            other_name,
            other_total,
            base_name,
            base_total,
            relative_diff * 100.0
        );
        match status {
            ValidationStatus::Warning => report.warnings.push(message),
            ValidationStatus::Error => report.errors.push(message),
            ValidationStatus::Informational => {}
        }

        report.status = report.status.max(status);
        report.comparisons.push(SourceComparison {
            base: base_name.clone(),
            other: other_name.clone(),
            base_total,
            other_total: *other_total,
            absolute_diff,
            relative_diff,
            status,
        });
    }

    report
}
