use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod settings;

pub use crate::settings::{
    AccountMapping, ProviderSettings, Settings, ValidationSettings,
};

/// The three canonical record kinds produced by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Cash,
    Positions,
    Transactions,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Cash,
        RecordKind::Positions,
        RecordKind::Transactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Cash => "cash",
            RecordKind::Positions => "positions",
            RecordKind::Transactions => "transactions",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a ledger entry, inferred from description keywords or the
/// sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Deposit,
    Withdrawal,
    Interest,
    Fee,
    Other,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Deposit => "deposit",
            Direction::Withdrawal => "withdrawal",
            Direction::Interest => "interest",
            Direction::Fee => "fee",
            Direction::Other => "other",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cash balance for one unified account on one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashRecord {
    pub date: NaiveDate,
    pub category: String,
    pub account: String,
    pub balance: f64,
    pub currency: String,
    pub source: String,
    pub collected_at: String,
}

/// One instrument holding in one unified account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    pub date: NaiveDate,
    pub account: String,
    pub name: String,
    pub ticker: String,
    pub quantity: f64,
    pub average_price: f64,
    pub currency: String,
    pub source: String,
    pub collected_at: String,
}

/// One ledger entry. `amount` keeps its sign; `direction` is the
/// keyword/sign classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub time: String,
    pub account: String,
    pub direction: Direction,
    pub category: String,
    pub subcategory: String,
    pub amount: f64,
    pub currency: String,
    pub note: String,
    pub source: String,
    pub collected_at: String,
}

/// The integrated output of one collection run: all three record kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordBatch {
    pub cash: Vec<CashRecord>,
    pub positions: Vec<PositionRecord>,
    pub transactions: Vec<TransactionRecord>,
}

impl RecordBatch {
    pub fn merge(&mut self, other: RecordBatch) {
        self.cash.extend(other.cash);
        self.positions.extend(other.positions);
        self.transactions.extend(other.transactions);
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Cash => self.cash.len(),
            RecordKind::Positions => self.positions.len(),
            RecordKind::Transactions => self.transactions.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.cash.len() + self.positions.len() + self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Outcome of one provider within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOutcome {
    pub provider: String,
    pub success: bool,
    pub cash: usize,
    pub positions: usize,
    pub transactions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-run summary returned alongside the integrated batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub providers: Vec<ProviderOutcome>,
    pub total_records: usize,
    pub elapsed_ms: u128,
}

impl RunSummary {
    pub fn successful(&self) -> usize {
        self.providers.iter().filter(|p| p.success).count()
    }

    pub fn failed(&self) -> usize {
        self.providers.len() - self.successful()
    }
}

/// Severity of a cross-source total comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Informational,
    Warning,
    Error,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationStatus::Informational => "informational",
            ValidationStatus::Warning => "warning",
            ValidationStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// One pairwise total-asset comparison against the base source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceComparison {
    pub base: String,
    pub other: String,
    pub base_total: f64,
    pub other_total: f64,
    pub absolute_diff: f64,
    pub relative_diff: f64,
    pub status: ValidationStatus,
}

/// Structured result of the cross-source sanity check. Detection only;
/// the caller decides whether to block export or merely warn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub totals: Vec<(String, f64)>,
    pub comparisons: Vec<SourceComparison>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}
