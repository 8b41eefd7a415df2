//! # Ledger Module
//!
//! Append-only CSV log with one row per ingest session.
//!
//! The file is meant to be opened in a spreadsheet on the ingest PC, so the
//! columns and value formats are fixed: timestamps as `YYYY-MM-DD HH:MM:SS`,
//! keep-originals as `Yes`/`No`, drives as their display label.

mod csv;

use crate::core::job::JobConfig;
use crate::error::LedgerError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Column order of the ledger file
pub const LEDGER_HEADERS: [&str; 10] = [
    "session_started_at",
    "session_finished_at",
    "status",
    "mode",
    "client",
    "project",
    "num_cards",
    "archive_drive",
    "proxy_drive",
    "keep_originals_on_proxy",
];

/// Timestamp format used in both time columns
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Ok,
    Failed,
    Canceled,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed ledger row. Values are kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub session_started_at: String,
    pub session_finished_at: String,
    pub status: String,
    pub mode: String,
    pub client: String,
    pub project: String,
    pub num_cards: String,
    pub archive_drive: String,
    pub proxy_drive: String,
    pub keep_originals_on_proxy: String,
}

impl LedgerEntry {
    fn from_fields(mut fields: Vec<String>) -> Self {
        fields.resize(LEDGER_HEADERS.len(), String::new());
        let mut it = fields.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Self {
            session_started_at: next(),
            session_finished_at: next(),
            status: next(),
            mode: next(),
            client: next(),
            project: next(),
            num_cards: next(),
            archive_drive: next(),
            proxy_drive: next(),
            keep_originals_on_proxy: next(),
        }
    }

    /// Values in column order
    pub fn fields(&self) -> [&str; 10] {
        [
            &self.session_started_at,
            &self.session_finished_at,
            &self.status,
            &self.mode,
            &self.client,
            &self.project,
            &self.num_cards,
            &self.archive_drive,
            &self.proxy_drive,
            &self.keep_originals_on_proxy,
        ]
    }

    /// Case-insensitive substring match against any column
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

fn session_fields(
    started_at: NaiveDateTime,
    finished_at: Option<NaiveDateTime>,
    status: LedgerStatus,
    job: &JobConfig,
) -> [String; 10] {
    [
        started_at.format(TIMESTAMP_FORMAT).to_string(),
        finished_at
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default(),
        status.as_str().to_string(),
        job.mode.as_str().to_string(),
        job.client_name.clone(),
        job.project_name.clone(),
        job.num_cards.to_string(),
        job.archive_label(),
        job.proxy_label(),
        if job.keep_originals_on_proxy { "Yes" } else { "No" }.to_string(),
    ]
}

/// Append one row for a finished session.
///
/// Creates the parent folder, and writes the header only for a new file.
pub fn append_session_row(
    ledger_path: &Path,
    started_at: NaiveDateTime,
    finished_at: Option<NaiveDateTime>,
    status: LedgerStatus,
    job: &JobConfig,
) -> Result<(), LedgerError> {
    let io_err = |source| LedgerError::Io {
        path: ledger_path.to_path_buf(),
        source,
    };

    if let Some(parent) = ledger_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let is_new = !ledger_path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(ledger_path)
        .map_err(io_err)?;

    let mut out = String::new();
    if is_new {
        out.push_str(&csv::format_record(&LEDGER_HEADERS));
        out.push_str("\r\n");
    }
    out.push_str(&csv::format_record(&session_fields(
        started_at,
        finished_at,
        status,
        job,
    )));
    out.push_str("\r\n");

    file.write_all(out.as_bytes()).map_err(io_err)?;

    tracing::info!(
        ledger = %ledger_path.display(),
        status = %status,
        client = %job.client_name,
        project = %job.project_name,
        "ledger row appended"
    );
    Ok(())
}

/// Formats accepted for a hand-entered date and time
pub const MANUAL_TIMESTAMP_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%d/%m/%y %H:%M"];

/// Parse a hand-entered date and time in any of the accepted formats
pub fn parse_manual_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    MANUAL_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Record a job that was copied outside the tool.
///
/// The row is `OK` with both timestamps set to `at`. Client and project are
/// required; drives, card count and the rest are written as given.
pub fn append_manual_row(
    ledger_path: &Path,
    at: NaiveDateTime,
    job: &JobConfig,
) -> Result<(), LedgerError> {
    if job.client_name.trim().is_empty() || job.project_name.trim().is_empty() {
        return Err(LedgerError::Incomplete(
            "client and project are required".to_string(),
        ));
    }
    append_session_row(ledger_path, at, Some(at), LedgerStatus::Ok, job)
}

/// Read every row of the ledger. A missing file is an empty ledger.
pub fn read_ledger(ledger_path: &Path) -> Result<Vec<LedgerEntry>, LedgerError> {
    let text = match fs::read_to_string(ledger_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LedgerError::Io {
                path: ledger_path.to_path_buf(),
                source,
            })
        }
    };

    let mut records = csv::parse_records(&text).into_iter();
    match records.next() {
        None => return Ok(Vec::new()),
        Some(header) if header.first().map(String::as_str) != Some(LEDGER_HEADERS[0]) => {
            return Err(LedgerError::Malformed {
                path: ledger_path.to_path_buf(),
                reason: format!("unexpected header starting with {:?}", header.first()),
            });
        }
        Some(_) => {}
    }

    let mut entries = Vec::new();
    for (i, record) in records.enumerate() {
        if record.len() > LEDGER_HEADERS.len() {
            return Err(LedgerError::Malformed {
                path: ledger_path.to_path_buf(),
                reason: format!(
                    "row {} has {} fields, expected {}",
                    i + 2,
                    record.len(),
                    LEDGER_HEADERS.len()
                ),
            });
        }
        entries.push(LedgerEntry::from_fields(record));
    }
    Ok(entries)
}

/// Entries matching `query` in any column. An empty query keeps everything.
pub fn filter_entries<'a>(entries: &'a [LedgerEntry], query: &str) -> Vec<&'a LedgerEntry> {
    let query = query.trim();
    entries
        .iter()
        .filter(|entry| query.is_empty() || entry.matches(query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::JobMode;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn job() -> JobConfig {
        JobConfig {
            client_name: "Iriya".to_string(),
            project_name: "Yom HaAtsmaut".to_string(),
            num_cards: 3,
            archive_path: PathBuf::from("E:\\"),
            proxy_path: PathBuf::from("F:\\"),
            archive_drive_display: "E: - MyBook 2".to_string(),
            proxy_drive_display: String::new(),
            keep_originals_on_proxy: false,
            mode: JobMode::Existing,
        }
    }

    #[test]
    fn first_row_writes_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/ledger.csv");

        append_session_row(&path, at(9, 0), Some(at(11, 30)), LedgerStatus::Ok, &job()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], LEDGER_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "2026-01-15 09:00:00,2026-01-15 11:30:00,OK,existing,Iriya,Yom HaAtsmaut,3,E: - MyBook 2,F:\\,No"
        );
    }

    #[test]
    fn later_rows_append_without_header() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");

        append_session_row(&path, at(9, 0), None, LedgerStatus::Canceled, &job()).unwrap();
        append_session_row(&path, at(10, 0), Some(at(10, 5)), LedgerStatus::Failed, &job()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("session_started_at").count(), 1);

        let entries = read_ledger(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, "CANCELED");
        assert_eq!(entries[0].session_finished_at, "");
        assert_eq!(entries[1].status, "FAILED");
    }

    #[test]
    fn awkward_names_survive_a_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        let mut job = job();
        job.client_name = "Smith, \"The\" Agency".to_string();
        job.project_name = "Line one\nLine two".to_string();

        append_session_row(&path, at(9, 0), Some(at(9, 1)), LedgerStatus::Ok, &job).unwrap();

        let entries = read_ledger(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].client, "Smith, \"The\" Agency");
        assert_eq!(entries[0].project, "Line one\nLine two");
        assert_eq!(entries[0].keep_originals_on_proxy, "No");
    }

    #[test]
    fn missing_ledger_reads_empty() {
        let temp = TempDir::new().unwrap();
        assert!(read_ledger(&temp.path().join("nope.csv")).unwrap().is_empty());
    }

    #[test]
    fn foreign_csv_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        fs::write(&path, "name,size\na,1\n").unwrap();

        assert!(matches!(
            read_ledger(&path),
            Err(LedgerError::Malformed { .. })
        ));
    }

    #[test]
    fn filter_is_case_insensitive_over_all_columns() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        append_session_row(&path, at(9, 0), Some(at(9, 1)), LedgerStatus::Ok, &job()).unwrap();
        let mut other = job();
        other.client_name = "Bakery".to_string();
        other.archive_drive_display = "G: - Vault".to_string();
        append_session_row(&path, at(12, 0), None, LedgerStatus::Canceled, &other).unwrap();

        let entries = read_ledger(&path).unwrap();
        assert_eq!(filter_entries(&entries, "iriya").len(), 1);
        assert_eq!(filter_entries(&entries, "VAULT")[0].client, "Bakery");
        assert_eq!(filter_entries(&entries, "canceled").len(), 1);
        assert_eq!(filter_entries(&entries, "  ").len(), 2);
        assert!(filter_entries(&entries, "nothing like this").is_empty());
    }

    #[test]
    fn status_serializes_like_the_ledger() {
        assert_eq!(serde_json::to_string(&LedgerStatus::Canceled).unwrap(), "\"CANCELED\"");
        assert_eq!(LedgerStatus::Ok.to_string(), "OK");
    }

    #[test]
    fn manual_row_is_ok_with_one_timestamp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        let job = JobConfig {
            client_name: "Bakery".to_string(),
            project_name: "Launch".to_string(),
            num_cards: 4,
            archive_drive_display: "MyBook 3".to_string(),
            proxy_drive_display: "SSD B".to_string(),
            ..JobConfig::default()
        };

        append_manual_row(&path, at(14, 5), &job).unwrap();

        let entries = read_ledger(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_started_at, "2026-01-15 14:05:00");
        assert_eq!(entries[0].session_finished_at, "2026-01-15 14:05:00");
        assert_eq!(entries[0].status, "OK");
        assert_eq!(entries[0].num_cards, "4");
        assert_eq!(entries[0].archive_drive, "MyBook 3");
        assert_eq!(entries[0].proxy_drive, "SSD B");
    }

    #[test]
    fn manual_row_needs_client_and_project() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.csv");
        let job = JobConfig {
            client_name: "Bakery".to_string(),
            project_name: "   ".to_string(),
            ..JobConfig::default()
        };

        assert!(matches!(
            append_manual_row(&path, at(14, 5), &job),
            Err(LedgerError::Incomplete(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn manual_timestamps_accept_both_date_orders() {
        assert_eq!(parse_manual_timestamp("2026-01-15 14:05"), Some(at(14, 5)));
        assert_eq!(parse_manual_timestamp(" 15/01/26 14:05 "), Some(at(14, 5)));
        assert_eq!(parse_manual_timestamp("2026-01-15 14:05:00"), Some(at(14, 5)));
        assert_eq!(parse_manual_timestamp("yesterday"), None);
    }
}
