//! Turns the raw key/value maps the parsers emit into typed records.
//!
//! Sources label the same field differently, and in two languages, so each
//! canonical field carries an ordered synonym list. The first synonym
//! present in the raw map wins.

use chrono::NaiveDate;
use models::{CashRecord, Direction, PositionRecord, TransactionRecord};
use serde_json::Value;
use utils::dates::parse_date_or_serial;
use utils::numbers::coerce_number;

const ACCOUNT_KEYS: [&str; 3] = ["계좌명", "account", "계좌"];
const BALANCE_KEYS: [&str; 4] = ["잔액", "balance", "amount", "value"];
const CURRENCY_KEYS: [&str; 2] = ["통화", "currency"];
const CATEGORY_KEYS: [&str; 3] = ["카테고리", "category", "구분"];
const QUANTITY_KEYS: [&str; 2] = ["수량", "quantity"];
const AVG_PRICE_KEYS: [&str; 2] = ["평균단가", "average_price"];
const NAME_KEYS: [&str; 2] = ["종목명", "name"];
const TICKER_KEYS: [&str; 3] = ["티커", "ticker", "symbol"];
const DATE_KEYS: [&str; 3] = ["거래일자", "date", "일자"];
const TIME_KEYS: [&str; 2] = ["거래시간", "time"];
const DESCRIPTION_KEYS: [&str; 3] = ["내용", "description", "적요"];
const AMOUNT_KEYS: [&str; 2] = ["금액", "amount"];

const DEPOSIT_KEYWORDS: [&str; 4] = ["입금", "급여", "월급", "수익"];
const WITHDRAWAL_KEYWORDS: [&str; 4] = ["출금", "이체", "송금", "결제"];
const INTEREST_KEYWORDS: [&str; 2] = ["이자", "배당"];
const FEE_KEYWORDS: [&str; 1] = ["수수료"];

const DEFAULT_CURRENCY: &str = "KRW";

fn lookup<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        if let Some(text) = raw.get(*key).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn lookup_string(raw: &Value, keys: &[&str]) -> String {
    lookup(raw, keys).unwrap_or("").to_string()
}

fn lookup_number(raw: &Value, keys: &[&str]) -> f64 {
    lookup(raw, keys).map(coerce_number).unwrap_or(0.0)
}

fn lookup_currency(raw: &Value) -> String {
    lookup(raw, &CURRENCY_KEYS)
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string()
}

fn lookup_date(raw: &Value, fallback: NaiveDate) -> NaiveDate {
    lookup(raw, &DATE_KEYS)
        .and_then(|text| parse_date_or_serial(text).ok())
        .unwrap_or(fallback)
}

/// Classifies a ledger entry from its description, falling back to the
/// sign of the amount when no keyword matches.
pub fn infer_direction(description: &str, amount: f64) -> Direction {
    if INTEREST_KEYWORDS.iter().any(|kw| description.contains(kw)) {
        return Direction::Interest;
    }
    if FEE_KEYWORDS.iter().any(|kw| description.contains(kw)) {
        return Direction::Fee;
    }
    if DEPOSIT_KEYWORDS.iter().any(|kw| description.contains(kw)) {
        return Direction::Deposit;
    }
    if WITHDRAWAL_KEYWORDS.iter().any(|kw| description.contains(kw)) {
        return Direction::Withdrawal;
    }
    if amount > 0.0 {
        Direction::Deposit
    } else if amount < 0.0 {
        Direction::Withdrawal
    } else {
        Direction::Other
    }
}

/// Builds a cash record from one raw map. Returns the raw account label
/// alongside so the caller can run it through the alias table. Rows with
/// no account label at all are unusable.
pub fn normalize_cash(
    raw: &Value,
    source: &str,
    date: NaiveDate,
    collected_at: &str,
) -> Option<(String, CashRecord)> {
    let account = lookup(raw, &ACCOUNT_KEYS)?.to_string();
    let record = CashRecord {
        date: lookup_date(raw, date),
        category: lookup_string(raw, &CATEGORY_KEYS),
        account: account.clone(),
        balance: lookup_number(raw, &BALANCE_KEYS),
        currency: lookup_currency(raw),
        source: source.to_string(),
        collected_at: collected_at.to_string(),
    };
    Some((account, record))
}

pub fn normalize_position(
    raw: &Value,
    source: &str,
    date: NaiveDate,
    collected_at: &str,
) -> Option<(String, PositionRecord)> {
    let account = lookup(raw, &ACCOUNT_KEYS)?.to_string();
    let name = lookup(raw, &NAME_KEYS)?.to_string();
    let record = PositionRecord {
        date: lookup_date(raw, date),
        account: account.clone(),
        name,
        ticker: lookup_string(raw, &TICKER_KEYS),
        quantity: lookup_number(raw, &QUANTITY_KEYS),
        average_price: lookup_number(raw, &AVG_PRICE_KEYS),
        currency: lookup_currency(raw),
        source: source.to_string(),
        collected_at: collected_at.to_string(),
    };
    Some((account, record))
}

/// Builds a transaction record. Unlike balances and holdings, ledger rows
/// keep the date the source wrote, not the collection date. The label is
/// `None` when the source carries no account column; those rows are
/// attributed to the provider itself and skip resolution.
pub fn normalize_transaction(
    raw: &Value,
    source: &str,
    fallback_date: NaiveDate,
    collected_at: &str,
) -> (Option<String>, TransactionRecord) {
    let date = lookup(raw, &DATE_KEYS)
        .and_then(|text| parse_date_or_serial(text).ok())
        .unwrap_or(fallback_date);
    let description = lookup_string(raw, &DESCRIPTION_KEYS);
    let amount = lookup_number(raw, &AMOUNT_KEYS);
    let label = lookup(raw, &ACCOUNT_KEYS).map(str::to_string);

    let record = TransactionRecord {
        date,
        time: lookup_string(raw, &TIME_KEYS),
        account: label.clone().unwrap_or_else(|| source.to_string()),
        direction: infer_direction(&description, amount),
        category: description.clone(),
        subcategory: lookup_string(raw, &NAME_KEYS),
        amount,
        currency: lookup_currency(raw),
        note: description,
        source: source.to_string(),
        collected_at: collected_at.to_string(),
    };
    (label, record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()
    }

    #[test]
    fn synonyms_map_to_the_same_field() {
        let korean = json!({"계좌명": "위탁계좌", "잔액": "1,000,000", "통화": "KRW"});
        let english = json!({"account": "위탁계좌", "balance": "1,000,000"});

        let (_, a) = normalize_cash(&korean, "workbook", day(), "t").unwrap();
        let (_, b) = normalize_cash(&english, "manual", day(), "t").unwrap();
        assert_eq!(a.account, b.account);
        assert_eq!(a.balance, b.balance);
        assert_eq!(a.balance, 1_000_000.0);
        assert_eq!(b.currency, "KRW");
    }

    #[test]
    fn cash_without_account_is_dropped() {
        let raw = json!({"잔액": "1,000"});
        assert!(normalize_cash(&raw, "s", day(), "t").is_none());
    }

    #[test]
    fn position_fields_are_coerced() {
        let raw = json!({
            "계좌명": "토스증권",
            "종목명": "삼성전자",
            "티커": "005930",
            "수량": "10",
            "평균단가": "70,000원",
        });
        let (_, p) = normalize_position(&raw, "snapshot", day(), "t").unwrap();
        assert_eq!(p.quantity, 10.0);
        assert_eq!(p.average_price, 70_000.0);
        assert_eq!(p.ticker, "005930");
    }

    #[test]
    fn direction_keywords_beat_the_sign() {
        assert_eq!(infer_direction("급여 입금", 100.0), Direction::Deposit);
        assert_eq!(infer_direction("카드 결제", -100.0), Direction::Withdrawal);
        assert_eq!(infer_direction("예금이자", 10.0), Direction::Interest);
        assert_eq!(infer_direction("배당금", 10.0), Direction::Interest);
        assert_eq!(infer_direction("거래 수수료", -1.0), Direction::Fee);
        // Keyword wins even when the sign disagrees.
        assert_eq!(infer_direction("이체", 100.0), Direction::Withdrawal);
    }

    #[test]
    fn direction_falls_back_to_sign() {
        assert_eq!(infer_direction("기타", 100.0), Direction::Deposit);
        assert_eq!(infer_direction("기타", -100.0), Direction::Withdrawal);
        assert_eq!(infer_direction("기타", 0.0), Direction::Other);
    }

    #[test]
    fn transaction_keeps_its_own_date() {
        let raw = json!({
            "거래일자": "2024-01-03",
            "거래시간": "09:00:00",
            "내용": "입금",
            "금액": "500,000",
        });
        let (label, t) = normalize_transaction(&raw, "workbook", day(), "t");
        assert_eq!(label, None);
        assert_eq!(t.account, "workbook");
        assert_eq!(t.date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(t.direction, Direction::Deposit);
        assert_eq!(t.amount, 500_000.0);
    }

    #[test]
    fn transaction_with_account_column_reports_its_label() {
        let raw = json!({"거래일자": "2024-01-03", "계좌명": "위탁계좌", "금액": "-1"});
        let (label, t) = normalize_transaction(&raw, "workbook", day(), "t");
        assert_eq!(label.as_deref(), Some("위탁계좌"));
        assert_eq!(t.account, "위탁계좌");
    }
}
