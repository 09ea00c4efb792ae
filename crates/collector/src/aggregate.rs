//! Collapses overlap between sources after the per-provider batches merge.
//!
//! Balances and holdings are point-in-time facts, so the later record for
//! the same key wins. Ledger entries are events, so the first occurrence
//! wins and re-runs cannot multiply them. Running the pass twice changes
//! nothing.

use std::collections::HashMap;

use models::RecordBatch;

/// One logical cash balance per account and currency.
fn dedup_cash(batch: &mut RecordBatch) {
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    let mut kept = Vec::new();
    for record in batch.cash.drain(..) {
        let key = (record.account.clone(), record.currency.clone());
        match seen.get(&key) {
            Some(&idx) => kept[idx] = record,
            None => {
                seen.insert(key, kept.len());
                kept.push(record);
            }
        }
    }
    kept.sort_by(|a, b| (&a.account, &a.currency).cmp(&(&b.account, &b.currency)));
    batch.cash = kept;
}

/// One holding per account and ticker.
fn dedup_positions(batch: &mut RecordBatch) {
    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    let mut kept = Vec::new();
    for record in batch.positions.drain(..) {
        let key = (record.account.clone(), record.ticker.clone());
        match seen.get(&key) {
            Some(&idx) => kept[idx] = record,
            None => {
                seen.insert(key, kept.len());
                kept.push(record);
            }
        }
    }
    kept.sort_by(|a, b| (&a.account, &a.ticker).cmp(&(&b.account, &b.ticker)));
    batch.positions = kept;
}

/// Ledger entries dedup on when, what, and how much. Amounts key on their
/// bit pattern since the values come from the same coercion path.
fn dedup_transactions(batch: &mut RecordBatch) {
    let mut seen: HashMap<(String, String, String, u64), ()> = HashMap::new();
    let mut kept = Vec::new();
    for record in batch.transactions.drain(..) {
        let label = if record.subcategory.is_empty() {
            record.category.clone()
        } else {
            record.subcategory.clone()
        };
        let key = (
            record.date.to_string(),
            record.time.clone(),
            label,
            record.amount.to_bits(),
        );
        if seen.insert(key, ()).is_none() {
            kept.push(record);
        }
    }
    kept.sort_by(|a, b| b.date.cmp(&a.date));
    batch.transactions = kept;
}

/// Applies all three dedup passes in place.
pub fn aggregate(batch: &mut RecordBatch) {
    dedup_cash(batch);
    dedup_positions(batch);
    dedup_transactions(batch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use models::{CashRecord, Direction, PositionRecord, TransactionRecord};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn cash(account: &str, currency: &str, balance: f64, source: &str) -> CashRecord {
        CashRecord {
            date: day(15),
            category: String::new(),
            account: account.to_string(),
            balance,
            currency: currency.to_string(),
            source: source.to_string(),
            collected_at: String::new(),
        }
    }

    fn position(account: &str, ticker: &str, quantity: f64) -> PositionRecord {
        PositionRecord {
            date: day(15),
            account: account.to_string(),
            name: ticker.to_string(),
            ticker: ticker.to_string(),
            quantity,
            average_price: 100.0,
            currency: "KRW".to_string(),
            source: "snapshot".to_string(),
            collected_at: String::new(),
        }
    }

    fn transaction(d: u32, time: &str, label: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            date: day(d),
            time: time.to_string(),
            account: "A".to_string(),
            direction: Direction::Other,
            category: label.to_string(),
            subcategory: String::new(),
            amount,
            currency: "KRW".to_string(),
            note: String::new(),
            source: "workbook".to_string(),
            collected_at: String::new(),
        }
    }

    #[test]
    fn overlapping_cash_keeps_the_later_record() {
        let mut batch = RecordBatch::default();
        batch.cash.push(cash("A", "KRW", 100.0, "snapshot"));
        batch.cash.push(cash("B", "KRW", 200.0, "snapshot"));
        batch.cash.push(cash("A", "KRW", 150.0, "manual"));
        batch.cash.push(cash("C", "KRW", 300.0, "manual"));

        aggregate(&mut batch);
        assert_eq!(batch.cash.len(), 3);
        let a = batch.cash.iter().find(|c| c.account == "A").unwrap();
        assert_eq!(a.balance, 150.0);
        assert_eq!(a.source, "manual");
    }

    #[test]
    fn same_account_different_currency_both_stay() {
        let mut batch = RecordBatch::default();
        batch.cash.push(cash("A", "KRW", 100.0, "s"));
        batch.cash.push(cash("A", "USD", 50.0, "s"));
        aggregate(&mut batch);
        assert_eq!(batch.cash.len(), 2);
    }

    #[test]
    fn disjoint_positions_all_survive() {
        let mut batch = RecordBatch::default();
        for (account, ticker) in [("A", "005930"), ("A", "360750"), ("B", "005930")] {
            batch.positions.push(position(account, ticker, 1.0));
        }
        for (account, ticker) in [("C", "005930"), ("C", "GOLD"), ("D", "360750")] {
            batch.positions.push(position(account, ticker, 2.0));
        }
        aggregate(&mut batch);
        assert_eq!(batch.positions.len(), 6);
    }

    #[test]
    fn transactions_keep_first_and_sort_latest_first() {
        let mut batch = RecordBatch::default();
        batch
            .transactions
            .push(transaction(14, "09:00", "매수", -100.0));
        batch
            .transactions
            .push(transaction(16, "10:00", "입금", 500.0));
        batch
            .transactions
            .push(transaction(14, "09:00", "매수", -100.0));

        aggregate(&mut batch);
        assert_eq!(batch.transactions.len(), 2);
        assert_eq!(batch.transactions[0].date, day(16));
        assert_eq!(batch.transactions[1].date, day(14));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let mut batch = RecordBatch::default();
        batch.cash.push(cash("A", "KRW", 100.0, "s"));
        batch.cash.push(cash("A", "KRW", 120.0, "m"));
        batch.positions.push(position("A", "005930", 3.0));
        batch
            .transactions
            .push(transaction(14, "09:00", "매수", -100.0));

        aggregate(&mut batch);
        let first = serde_json::to_string(&batch).unwrap();
        aggregate(&mut batch);
        let second = serde_json::to_string(&batch).unwrap();
        assert_eq!(first, second);
    }
}
