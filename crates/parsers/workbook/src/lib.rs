//! Parser for the brokerage workbook export (.xlsx).
//!
//! The export carries two layouts. Account balances sit in a block anchored
//! by a literal marker cell in the first column; the row right below the
//! marker is the column header. The ledger sheet is flat, with its header
//! in row zero.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Map, Value};

pub const PARSER_NAME: &str = "workbook";

const BALANCE_ANCHOR: &str = "계좌별 잔액";
const ANCHOR_SCAN_ROWS: usize = 20;

const ACCOUNT_HEADER: &str = "계좌명";
const DATE_HEADER: &str = "거래일자";
const AMOUNT_HEADER: &str = "금액";

/// Everything extracted from one workbook file.
#[derive(Debug, Default)]
pub struct WorkbookExtract {
    pub cash: Vec<Value>,
    pub transactions: Vec<Value>,
}

pub struct WorkbookParser {
    /// When set, ledger rows outside this calendar month are dropped.
    pub recent_month: Option<NaiveDate>,
}

impl WorkbookParser {
    pub fn new() -> Self {
        Self { recent_month: None }
    }

    pub fn with_recent_month(reference: NaiveDate) -> Self {
        Self {
            recent_month: Some(reference),
        }
    }

    /// Opens the workbook and extracts balances and ledger entries from
    /// every sheet. Sheets that match neither layout contribute nothing.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<WorkbookExtract> {
        let path = path.as_ref();
        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let mut extract = WorkbookExtract::default();
        let sheet_names = workbook.sheet_names().to_vec();
        for sheet_name in sheet_names {
            if let Ok(range) = workbook.worksheet_range(&sheet_name) {
                extract.cash.extend(parse_balance_sheet(&range));
                extract
                    .transactions
                    .extend(parse_ledger_sheet(&range, self.recent_month));
            }
        }

        if extract.cash.is_empty() && extract.transactions.is_empty() {
            tracing::warn!(path = %path.display(), "Workbook yielded no records");
        }
        Ok(extract)
    }
}

impl Default for WorkbookParser {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_text(range: &Range<Data>, row: usize, col: usize) -> String {
    range
        .get((row, col))
        .map(|c| c.to_string().trim().to_string())
        .unwrap_or_default()
}

/// Reads the balance block anchored by the marker cell. The marker is
/// searched in the first column only; the row below it names the columns
/// and data rows follow until the account cell runs empty.
pub fn parse_balance_sheet(range: &Range<Data>) -> Vec<Value> {
    let (height, width) = range.get_size();

    let Some(anchor_row) =
        (0..height.min(ANCHOR_SCAN_ROWS)).find(|&row| cell_text(range, row, 0) == BALANCE_ANCHOR)
    else {
        return Vec::new();
    };

    let header_row = anchor_row + 1;
    if header_row >= height {
        return Vec::new();
    }
    let headers: Vec<String> = (0..width).map(|col| cell_text(range, header_row, col)).collect();
    let Some(account_col) = headers.iter().position(|h| h == ACCOUNT_HEADER) else {
        tracing::warn!("Balance block header has no account column");
        return Vec::new();
    };

    let mut records = Vec::new();
    for row in (header_row + 1)..height {
        if cell_text(range, row, account_col).is_empty() {
            break;
        }
        let mut map = Map::new();
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            map.insert(header.clone(), json!(cell_text(range, row, col)));
        }
        records.push(Value::Object(map));
    }
    records
}

/// Reads the flat ledger sheet. Row zero must name at least the date and
/// amount columns; otherwise the sheet is not a ledger and yields nothing.
pub fn parse_ledger_sheet(range: &Range<Data>, recent_month: Option<NaiveDate>) -> Vec<Value> {
    let (height, width) = range.get_size();
    if height == 0 {
        return Vec::new();
    }

    let headers: Vec<String> = (0..width).map(|col| cell_text(range, 0, col)).collect();
    if !headers.iter().any(|h| h == DATE_HEADER) || !headers.iter().any(|h| h == AMOUNT_HEADER) {
        return Vec::new();
    }
    let date_col = headers
        .iter()
        .position(|h| h == DATE_HEADER)
        .unwrap_or_default();

    let mut records = Vec::new();
    for row in 1..height {
        let date_text = cell_text(range, row, date_col);
        if date_text.is_empty() {
            continue;
        }
        if let Some(reference) = recent_month {
            match utils::dates::parse_date_or_serial(&date_text) {
                Ok(date) => {
                    if date.year() != reference.year() || date.month() != reference.month() {
                        continue;
                    }
                }
                Err(_) => continue,
            }
        }
        let mut map = Map::new();
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            map.insert(header.clone(), json!(cell_text(range, row, col)));
        }
        records.push(Value::Object(map));
    }
    records
}
