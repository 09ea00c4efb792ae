use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

/// Date formats accepted in statement cells, in the order they are tried.
const CELL_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%Y%m%d"];

/// Parses a date string in any of the statement formats.
pub fn parse_flexible_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    for fmt in CELL_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    Err(anyhow!("Unrecognized date format: {}", s))
}

/// Parses a date cell that may hold an Excel serial number instead of text.
pub fn parse_date_or_serial(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    if let Ok(serial) = s.parse::<f64>() {
        // Excel dates are days since 1899-12-30 (with the 1900 leap year bug)
        if serial >= 1.0 && serial < 100_000.0 {
            let days = serial.floor() as i64;
            let base_date = NaiveDate::from_ymd_opt(1899, 12, 30)
                .context("building Excel epoch date")?;
            if let Some(date) = base_date.checked_add_signed(chrono::Duration::days(days)) {
                return Ok(date);
            }
        }
    }

    parse_flexible_date(s)
}

/// Extracts the date encoded in a dated input folder name.
///
/// Recognized patterns: `YYYY-MM-DD`, `YYYYMMDD`, `YYYY_MM_DD`.
pub fn extract_folder_date(folder: &Path) -> Option<NaiveDate> {
    let name = folder.file_name()?.to_str()?;

    if let Ok(date) = NaiveDate::parse_from_str(name, "%Y-%m-%d") {
        return Some(date);
    }
    if name.len() == 8 && name.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(name, "%Y%m%d") {
            return Some(date);
        }
    }
    if name.matches('_').count() == 2 {
        if let Ok(date) = NaiveDate::parse_from_str(name, "%Y_%m_%d") {
            return Some(date);
        }
    }
    None
}

/// Scans the immediate subfolders of `root` for date-named folders and
/// returns the most recent one together with its date.
pub fn latest_dated_folder(root: &Path) -> Result<Option<(NaiveDate, PathBuf)>> {
    if !root.exists() {
        return Ok(None);
    }

    let mut dated: Vec<(NaiveDate, PathBuf)> = Vec::new();
    let entries =
        fs::read_dir(root).with_context(|| format!("Reading input dir: {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(date) = extract_folder_date(&path) {
            dated.push((date, path));
        }
    }

    dated.sort_by_key(|(date, _)| *date);
    Ok(dated.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parse_flexible_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
        assert_eq!(parse_flexible_date("2024-09-10").unwrap(), expected);
        assert_eq!(parse_flexible_date("2024/09/10").unwrap(), expected);
        assert_eq!(parse_flexible_date("2024.09.10").unwrap(), expected);
        assert_eq!(parse_flexible_date("09/10/2024").unwrap(), expected);
        assert_eq!(parse_flexible_date("20240910").unwrap(), expected);
        assert!(parse_flexible_date("not-a-date").is_err());
    }

    #[test]
    fn parse_serial_date() {
        // 2024-01-01 is serial 45292
        let date = parse_date_or_serial("45292").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn folder_date_patterns() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        assert_eq!(extract_folder_date(Path::new("/in/2024-02-15")), Some(d));
        assert_eq!(extract_folder_date(Path::new("/in/20240215")), Some(d));
        assert_eq!(extract_folder_date(Path::new("/in/2024_02_15")), Some(d));
        assert_eq!(extract_folder_date(Path::new("/in/export")), None);
        assert_eq!(extract_folder_date(Path::new("/in/2024-13-99")), None);
    }

    #[test]
    fn latest_folder_picks_most_recent() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["2024-01-01", "2024-02-15", "2023-12-31", "notes"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }

        let (date, path) = latest_dated_folder(tmp.path()).unwrap().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(path.file_name().unwrap(), "2024-02-15");
    }

    #[test]
    fn latest_folder_empty_or_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(latest_dated_folder(tmp.path()).unwrap().is_none());
        assert!(
            latest_dated_folder(Path::new("/no/such/dir"))
                .unwrap()
                .is_none()
        );
    }
}
