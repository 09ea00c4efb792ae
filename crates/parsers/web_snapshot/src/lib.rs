//! Parser for MHTML snapshots saved from the aggregation web app.
//!
//! The snapshot is a MIME-wrapped, quoted-printable HTML page. One file
//! carries all three record kinds: a cash section, a holdings table, and a
//! recent-activity list.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use mailparse::{parse_mail, ParsedMail};
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};

pub const PARSER_NAME: &str = "snapshot";

const CASH_HEADING: &str = "현금";
const POSITIONS_HEADING: &str = "보유자산";
const TRANSACTIONS_HEADING: &str = "거래내역";
const DIVIDEND_KEYWORD: &str = "배당";

fn section_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("section").expect("invalid section selector"))
}

fn heading_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("h2").expect("invalid heading selector"))
}

fn item_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("li").expect("invalid item selector"))
}

fn span_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("span").expect("invalid span selector"))
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("invalid row selector"))
}

fn cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td").expect("invalid cell selector"))
}

fn styled_div_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("div[style]").expect("invalid div selector"))
}

/// Everything extracted from one snapshot file.
#[derive(Debug, Default)]
pub struct SnapshotExtract {
    pub cash: Vec<Value>,
    pub positions: Vec<Value>,
    pub transactions: Vec<Value>,
}

pub struct SnapshotParser;

impl SnapshotParser {
    pub fn new() -> Self {
        Self
    }

    /// Reads the MHTML file, decodes the HTML body, and extracts all three
    /// record kinds.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<SnapshotExtract> {
        let path = path.as_ref();
        let raw = fs::read(path)
            .with_context(|| format!("Reading snapshot file: {}", path.display()))?;
        let html = decode_html_body(&raw)
            .with_context(|| format!("Decoding MHTML body: {}", path.display()))?;
        Ok(self.parse_html(&html))
    }

    /// Extracts cash, positions, and transactions from the decoded HTML.
    /// Missing sections yield empty vectors, never an error.
    pub fn parse_html(&self, html: &str) -> SnapshotExtract {
        let doc = Html::parse_document(html);
        SnapshotExtract {
            cash: parse_cash_section(&doc),
            positions: parse_positions_section(&doc),
            transactions: parse_transactions_section(&doc),
        }
    }
}

impl Default for SnapshotParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Unwraps the MIME envelope and returns the decoded text/html body.
/// Quoted-printable transfer encoding is undone by the MIME layer.
pub fn decode_html_body(raw: &[u8]) -> Result<String> {
    let mail = parse_mail(raw).context("Parsing MIME envelope")?;
    extract_best_body(&mail).ok_or_else(|| anyhow!("No text/html part in snapshot"))
}

fn extract_best_body(mail: &ParsedMail) -> Option<String> {
    fn walk(mail: &ParsedMail, want_html: bool) -> Option<String> {
        let mime = mail.ctype.mimetype.to_ascii_lowercase();
        if (want_html && mime == "text/html") || (!want_html && mime == "text/plain") {
            if let Ok(body) = mail.get_body() {
                return Some(body);
            }
        }
        for part in &mail.subparts {
            if let Some(body) = walk(part, want_html) {
                return Some(body);
            }
        }
        None
    }

    walk(mail, true).or_else(|| walk(mail, false))
}

/// Finds the section whose heading text contains `title`.
fn find_section<'a>(doc: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    doc.select(section_selector()).find(|section| {
        section
            .select(heading_selector())
            .next()
            .map(|h| element_text(&h).contains(title))
            .unwrap_or(false)
    })
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn span_texts(el: &ElementRef) -> Vec<String> {
    el.select(span_selector()).map(|s| element_text(&s)).collect()
}

/// Cash items are list entries of [account, category, currency, balance].
fn parse_cash_section(doc: &Html) -> Vec<Value> {
    let Some(section) = find_section(doc, CASH_HEADING) else {
        tracing::warn!("Snapshot has no cash section");
        return Vec::new();
    };

    let mut records = Vec::new();
    for item in section.select(item_selector()) {
        let spans = span_texts(&item);
        if spans.len() < 4 {
            continue;
        }
        records.push(json!({
            "계좌명": spans[0],
            "카테고리": spans[1],
            "통화": spans[2],
            "잔액": spans[3],
        }));
    }
    records
}

/// The holdings table interleaves asset header rows with per-account detail
/// rows. A header row is marked by a column-direction flex container and
/// carries the instrument name and ticker; the detail rows that follow
/// belong to that instrument until the next header.
fn parse_positions_section(doc: &Html) -> Vec<Value> {
    let Some(section) = find_section(doc, POSITIONS_HEADING) else {
        tracing::warn!("Snapshot has no holdings section");
        return Vec::new();
    };

    let mut records = Vec::new();
    let mut current: Option<(String, String)> = None;

    for row in section.select(row_selector()) {
        if is_asset_header_row(&row) {
            let spans = span_texts(&row);
            if spans.len() >= 2 {
                current = Some((spans[0].clone(), spans[1].clone()));
            } else {
                current = None;
            }
            continue;
        }

        let cells: Vec<String> = row.select(cell_selector()).map(|c| element_text(&c)).collect();
        if cells.len() < 4 {
            continue;
        }
        // Detail rows before any header have no instrument to attach to.
        let Some((name, ticker)) = &current else {
            continue;
        };
        // Rows the app renders with a zero evaluated amount are stale.
        if utils::coerce_number(&cells[3]) == 0.0 {
            continue;
        }
        records.push(json!({
            "계좌명": cells[0],
            "종목명": name,
            "티커": ticker,
            "수량": cells[1],
            "평균단가": cells[2],
            "평가금액": cells[3],
        }));
    }
    records
}

fn is_asset_header_row(row: &ElementRef) -> bool {
    row.select(styled_div_selector()).any(|div| {
        div.value()
            .attr("style")
            .map(|style| {
                let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
                compact.contains("flex-direction:column")
            })
            .unwrap_or(false)
    })
}

/// Activity items are [date, time, kind, instrument, quantity, amount].
/// Dividend entries duplicate what the cash balance already reflects, so
/// they are dropped here.
fn parse_transactions_section(doc: &Html) -> Vec<Value> {
    let Some(section) = find_section(doc, TRANSACTIONS_HEADING) else {
        tracing::warn!("Snapshot has no activity section");
        return Vec::new();
    };

    let mut records = Vec::new();
    for item in section.select(item_selector()) {
        let spans = span_texts(&item);
        if spans.len() < 6 {
            continue;
        }
        if spans[2].contains(DIVIDEND_KEYWORD) {
            continue;
        }
        records.push(json!({
            "거래일자": spans[0],
            "거래시간": spans[1],
            "내용": spans[2],
            "종목명": spans[3],
            "수량": spans[4],
            "금액": spans[5],
        }));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<section>
  <h2>현금</h2>
  <ul>
    <li><span>KB국민 입출금</span><span>예금</span><span>KRW</span><span>1,250,000원</span></li>
    <li><span>토스증권</span><span>예수금</span><span>KRW</span><span>340,000원</span></li>
  </ul>
</section>
<section>
  <h2>보유자산</h2>
  <table>
    <tr><td>유령계좌</td><td>1</td><td>10,000</td><td>10,000</td></tr>
    <tr><td><div style="display:flex; flex-direction: column;">
      <span>삼성전자</span><span>005930</span>
    </div></td></tr>
    <tr><td>토스증권</td><td>10</td><td>70,000</td><td>700,000</td></tr>
    <tr><td>KB증권</td><td>5</td><td>69,000</td><td>345,000</td></tr>
    <tr><td>미래에셋</td><td>2</td><td>68,000</td><td>0</td></tr>
    <tr><td><div style="flex-direction:column">
      <span>TIGER 미국S&amp;P500</span><span>360750</span>
    </div></td></tr>
    <tr><td>토스증권</td><td>30</td><td>18,000</td><td>540,000</td></tr>
  </table>
</section>
<section>
  <h2>거래내역</h2>
  <ul>
    <li><span>2024-02-14</span><span>09:31:02</span><span>매수</span><span>삼성전자</span><span>10</span><span>-700,000</span></li>
    <li><span>2024-02-14</span><span>15:02:11</span><span>배당금 입금</span><span>TIGER 미국S&amp;P500</span><span></span><span>12,000</span></li>
    <li><span>2024-02-15</span><span>10:00:00</span><span>입금</span><span></span><span></span><span>500,000</span></li>
  </ul>
</section>
</body></html>"#;

    /// Quoted-printable encoding of the body: '=' and every non-ASCII
    /// byte become =XX escapes, line breaks pass through.
    fn encode_quoted_printable(text: &str) -> String {
        let mut out = String::new();
        for byte in text.bytes() {
            match byte {
                b'\r' | b'\n' => out.push(byte as char),
                b'=' | 0x80..=0xFF => out.push_str(&format!("={:02X}", byte)),
                _ => out.push(byte as char),
            }
        }
        out
    }

    fn mhtml_fixture() -> Vec<u8> {
        let body = encode_quoted_printable(PAGE);
        format!(
            "MIME-Version: 1.0\r\n\
             Content-Type: text/html; charset=\"utf-8\"\r\n\
             Content-Transfer-Encoding: quoted-printable\r\n\
             \r\n\
             {}",
            body
        )
        .into_bytes()
    }

    #[test]
    fn decodes_quoted_printable_html_body() {
        let raw = mhtml_fixture();
        // The wire form carries only =XX escapes for the Korean headings.
        assert!(!String::from_utf8_lossy(&raw).contains("현금"));

        let html = decode_html_body(&raw).unwrap();
        assert!(html.contains("현금"));
        assert!(html.contains("보유자산"));
        assert!(html.contains("flex-direction: column"));
    }

    #[test]
    fn parses_cash_items() {
        let extract = SnapshotParser::new().parse_html(PAGE);
        assert_eq!(extract.cash.len(), 2);
        assert_eq!(extract.cash[0]["계좌명"], "KB국민 입출금");
        assert_eq!(extract.cash[0]["잔액"], "1,250,000원");
        assert_eq!(extract.cash[1]["통화"], "KRW");
    }

    #[test]
    fn groups_detail_rows_under_preceding_asset_header() {
        let extract = SnapshotParser::new().parse_html(PAGE);
        // Two named holdings under 삼성전자, one under the ETF. The zero
        // evaluated row and the detail row before any header are dropped.
        assert_eq!(extract.positions.len(), 3);
        assert_eq!(extract.positions[0]["종목명"], "삼성전자");
        assert_eq!(extract.positions[0]["티커"], "005930");
        assert_eq!(extract.positions[0]["계좌명"], "토스증권");
        assert_eq!(extract.positions[1]["계좌명"], "KB증권");
        assert_eq!(extract.positions[2]["종목명"], "TIGER 미국S&P500");
        assert!(
            extract
                .positions
                .iter()
                .all(|p| p["계좌명"] != "유령계좌" && p["계좌명"] != "미래에셋")
        );
    }

    #[test]
    fn one_header_with_three_details_yields_three_holdings() {
        let page = r#"
<section>
  <h2>보유자산</h2>
  <table>
    <tr><td><div style="flex-direction:column"><span>카카오</span><span>035720</span></div></td></tr>
    <tr><td>계좌1</td><td>1</td><td>50,000</td><td>50,000</td></tr>
    <tr><td>계좌2</td><td>2</td><td>51,000</td><td>102,000</td></tr>
    <tr><td>계좌3</td><td>3</td><td>52,000</td><td>156,000</td></tr>
  </table>
</section>"#;
        let extract = SnapshotParser::new().parse_html(page);
        assert_eq!(extract.positions.len(), 3);
        assert!(extract
            .positions
            .iter()
            .all(|p| p["종목명"] == "카카오" && p["티커"] == "035720"));
    }

    #[test]
    fn filters_dividend_activity() {
        let extract = SnapshotParser::new().parse_html(PAGE);
        assert_eq!(extract.transactions.len(), 2);
        assert_eq!(extract.transactions[0]["내용"], "매수");
        assert_eq!(extract.transactions[1]["내용"], "입금");
    }

    #[test]
    fn missing_sections_yield_empty_output() {
        let extract = SnapshotParser::new().parse_html("<html><body></body></html>");
        assert!(extract.cash.is_empty());
        assert!(extract.positions.is_empty());
        assert!(extract.transactions.is_empty());
    }

    #[test]
    fn full_file_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), mhtml_fixture()).unwrap();
        let extract = SnapshotParser::new().parse_file(tmp.path()).unwrap();
        assert_eq!(extract.cash.len(), 2);
        assert_eq!(extract.positions.len(), 3);
        assert_eq!(extract.transactions.len(), 2);
    }
}
