//! Parser for the hand-maintained workbook.
//!
//! One file, three sheets named `cash`, `position`, and `transaction`,
//! each flat with its header in row zero. Header cells may carry a
//! parenthesized hint ("balance (KRW)"); everything from the first " ("
//! on is stripped so the hint never reaches the field name.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde_json::{json, Map, Value};

pub const PARSER_NAME: &str = "manual";

pub const CASH_SHEET: &str = "cash";
pub const POSITION_SHEET: &str = "position";
pub const TRANSACTION_SHEET: &str = "transaction";

/// Everything extracted from one manual workbook.
#[derive(Debug, Default)]
pub struct ManualExtract {
    pub cash: Vec<Value>,
    pub positions: Vec<Value>,
    pub transactions: Vec<Value>,
}

pub struct ManualParser;

impl ManualParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ManualExtract> {
        let path = path.as_ref();
        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let mut extract = ManualExtract::default();
        match workbook.worksheet_range(CASH_SHEET) {
            Ok(range) => extract.cash = parse_flat_sheet(&range),
            Err(_) => tracing::warn!(sheet = CASH_SHEET, "Sheet missing, skipping"),
        }
        match workbook.worksheet_range(POSITION_SHEET) {
            Ok(range) => extract.positions = parse_position_sheet(&range),
            Err(_) => tracing::warn!(sheet = POSITION_SHEET, "Sheet missing, skipping"),
        }
        match workbook.worksheet_range(TRANSACTION_SHEET) {
            Ok(range) => extract.transactions = parse_flat_sheet(&range),
            Err(_) => tracing::warn!(sheet = TRANSACTION_SHEET, "Sheet missing, skipping"),
        }
        Ok(extract)
    }
}

impl Default for ManualParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops the parenthesized hint from a header cell.
fn clean_header(raw: &str) -> String {
    match raw.find(" (") {
        Some(idx) => raw[..idx].trim().to_string(),
        None => raw.trim().to_string(),
    }
}

fn cell_text(range: &Range<Data>, row: usize, col: usize) -> String {
    range
        .get((row, col))
        .map(|c| c.to_string().trim().to_string())
        .unwrap_or_default()
}

fn read_headers(range: &Range<Data>) -> Vec<String> {
    let (_, width) = range.get_size();
    (0..width).map(|col| clean_header(&cell_text(range, 0, col))).collect()
}

fn row_map(range: &Range<Data>, headers: &[String], row: usize) -> Map<String, Value> {
    let mut map = Map::new();
    for (col, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        map.insert(header.clone(), json!(cell_text(range, row, col)));
    }
    map
}

/// Reads a flat sheet into one raw map per non-empty row.
pub fn parse_flat_sheet(range: &Range<Data>) -> Vec<Value> {
    let (height, _) = range.get_size();
    if height < 2 {
        return Vec::new();
    }
    let headers = read_headers(range);

    let mut records = Vec::new();
    for row in 1..height {
        let map = row_map(range, &headers, row);
        if map.values().all(|v| v.as_str().map(str::is_empty).unwrap_or(true)) {
            continue;
        }
        records.push(Value::Object(map));
    }
    records
}

/// The position sheet groups rows the way the on-screen view does: a line
/// naming an instrument but carrying no quantity opens a group, and the
/// account rows below inherit its name and ticker until the next group.
pub fn parse_position_sheet(range: &Range<Data>) -> Vec<Value> {
    let (height, _) = range.get_size();
    if height < 2 {
        return Vec::new();
    }
    let headers = read_headers(range);
    let name_key = "name";
    let ticker_key = "ticker";
    let quantity_key = "quantity";

    let mut records = Vec::new();
    let mut context: Option<(String, String)> = None;

    for row in 1..height {
        let mut map = row_map(range, &headers, row);
        let name = map.get(name_key).and_then(Value::as_str).unwrap_or("").to_string();
        let ticker = map
            .get(ticker_key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let quantity = map
            .get(quantity_key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        if !name.is_empty() && quantity.is_empty() {
            context = Some((name, ticker));
            continue;
        }
        if quantity.is_empty() {
            continue;
        }
        if name.is_empty() {
            let Some((ctx_name, ctx_ticker)) = &context else {
                continue;
            };
            map.insert(name_key.to_string(), json!(ctx_name));
            map.insert(ticker_key.to_string(), json!(ctx_ticker));
        }
        records.push(Value::Object(map));
    }
    records
}
