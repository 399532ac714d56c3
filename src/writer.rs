//! CSV Report Writer
//!
//! Writes report rows to a timestamped CSV file whose name is restricted to
//! a portable character set.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::types::ReportRow;

/// Longest file name most filesystems accept
pub const FILENAME_CHAR_LIMIT: usize = 255;

const FILENAME_PREFIX: &str = "sso_report_Account_Assignments_";

const HEADER: [&str; 5] = [
    "AccountID",
    "AccountName",
    "ObjectType",
    "ObjectName",
    "PermissionSet",
];

/// One CSV record, columns in header order
#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    account_id: String,
    account_name: &'a str,
    object_type: String,
    object_name: &'a str,
    permission_set: &'a str,
}

impl<'a> From<&'a ReportRow> for CsvRecord<'a> {
    fn from(row: &'a ReportRow) -> Self {
        Self {
            account_id: text_forced(&row.account_id),
            account_name: &row.account_name,
            object_type: row.object_type.to_string(),
            object_name: &row.object_name,
            permission_set: &row.permission_set_name,
        }
    }
}

/// Prefix a value so spreadsheets keep it as text (leading zeros survive)
pub fn text_forced(value: &str) -> String {
    format!("'{}", value)
}

fn is_valid_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ' ')
}

/// Restrict a file name to `[A-Za-z0-9-_.() ]`, spaces becoming `_`
///
/// Accented letters are NFKD-decomposed first so they keep their base
/// letter. Names longer than `char_limit` are truncated with a warning.
pub fn clean_filename(filename: &str, char_limit: usize) -> String {
    let cleaned: String = filename
        .nfkd()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| is_valid_filename_char(*c))
        .collect();

    if cleaned.len() > char_limit {
        warn!(
            "Filename truncated because it was over {} characters. Filenames may no longer be unique",
            char_limit
        );
        // only ASCII survives the filter, so byte and char counts agree
        return cleaned[..char_limit].to_string();
    }

    cleaned
}

/// File name for a report generated at `now`
pub fn report_filename(now: DateTime<Local>) -> String {
    let raw = format!("{}{}.csv", FILENAME_PREFIX, now.format("%Y-%m-%d_%H.%M.%S"));
    clean_filename(&raw, FILENAME_CHAR_LIMIT)
}

/// Write rows as CSV to any writer, header first
pub fn write_csv<W: std::io::Write>(writer: W, rows: &[ReportRow]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer
        .write_record(HEADER)
        .context("Failed to write CSV header")?;

    for row in rows {
        csv_writer
            .serialize(CsvRecord::from(row))
            .with_context(|| format!("Failed to write row for account {}", row.account_id))?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write the report into `dir`, returning the path of the new file
pub fn write_report(dir: &Path, rows: &[ReportRow], now: DateTime<Local>) -> Result<PathBuf> {
    let path = dir.join(report_filename(now));

    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(file, rows)?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrincipalType;
    use chrono::TimeZone;

    fn sample_rows() -> Vec<ReportRow> {
        vec![
            ReportRow {
                account_id: "012345678901".to_string(),
                account_name: "Dev".to_string(),
                object_type: PrincipalType::User,
                object_name: "alice".to_string(),
                permission_set_name: "AdminAccess".to_string(),
            },
            ReportRow {
                account_id: "222".to_string(),
                account_name: "Prod, EU".to_string(),
                object_type: PrincipalType::Group,
                object_name: "devs".to_string(),
                permission_set_name: "ReadOnly".to_string(),
            },
        ]
    }

    #[test]
    fn test_clean_filename_replaces_and_filters() {
        assert_eq!(clean_filename("my report: v1?.csv", 255), "my_report_v1.csv");
        assert_eq!(clean_filename("r\u{e9}sum\u{e9}(1).csv", 255), "resume(1).csv");
        assert_eq!(clean_filename("\u{fb01}le \u{2460}.csv", 255), "file_1.csv");
    }

    #[test]
    fn test_clean_filename_is_idempotent() {
        for name in ["a b/c.csv", "sso_report_2024-01-01_10.00.00.csv", "\u{1f600} x", "Caf\u{e9}", ""] {
            let once = clean_filename(name, 255);
            assert_eq!(clean_filename(&once, 255), once);
        }
    }

    #[test]
    fn test_clean_filename_truncates_to_limit() {
        let long = "x".repeat(300);
        let cleaned = clean_filename(&long, FILENAME_CHAR_LIMIT);
        assert_eq!(cleaned.len(), FILENAME_CHAR_LIMIT);

        let short = clean_filename("abcdef", 3);
        assert_eq!(short, "abc");
    }

    #[test]
    fn test_report_filename_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            report_filename(now),
            "sso_report_Account_Assignments_2024-03-09_14.05.07.csv"
        );
    }

    #[test]
    fn test_write_csv_layout() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &sample_rows()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "AccountID,AccountName,ObjectType,ObjectName,PermissionSet");
        assert_eq!(lines[1], "'012345678901,Dev,USER,alice,AdminAccess");
        assert_eq!(lines[2], "'222,\"Prod, EU\",GROUP,devs,ReadOnly");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[]).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "AccountID,AccountName,ObjectType,ObjectName,PermissionSet\n");
    }

    #[test]
    fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let path = write_report(dir.path(), &sample_rows(), now).unwrap();

        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("sso_report_Account_Assignments_2024-03-09_14.05.07.csv")
        );
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("AccountID,"));
        assert_eq!(contents.lines().count(), 3);
    }
}
