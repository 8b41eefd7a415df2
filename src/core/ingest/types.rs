//! Request and result types for a single card ingest.

use crate::core::copier::CopyExit;
use crate::core::layout::Destination;
use crate::core::space::format_gb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Inputs for copying one card to both destinations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Root of the card, e.g. `G:\` or `/media/SONY_CARD`
    pub source_root: PathBuf,
    pub archive_root: PathBuf,
    pub proxy_root: PathBuf,
    /// Top-level studio folder on both destinations
    pub base_folder_name: String,
    /// Already sanitized, see `JobConfig::safe_project_folder`
    pub client_project: String,
    /// ISO date, e.g. `2026-01-15`
    pub ingest_date: String,
    /// 1 for SD1, 2 for SD2, ...
    pub card_index: u32,
}

/// Why an ingest ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestReason {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOT_ENOUGH_SPACE")]
    NotEnoughSpace,
    #[serde(rename = "ROBOCOPY_FAILED")]
    CopyFailed,
}

impl IngestReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotEnoughSpace => "NOT_ENOUGH_SPACE",
            Self::CopyFailed => "ROBOCOPY_FAILED",
        }
    }
}

impl fmt::Display for IngestReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Figures from the pre-flight space check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceReport {
    /// Bytes in use on the card
    pub source_used_bytes: u64,
    /// Used plus safety margin
    pub required_bytes: u64,
    pub archive_free_bytes: u64,
    pub proxy_free_bytes: u64,
}

impl SpaceReport {
    pub fn free_bytes(&self, destination: Destination) -> u64 {
        match destination {
            Destination::Archive => self.archive_free_bytes,
            Destination::Proxy => self.proxy_free_bytes,
        }
    }

    /// How many bytes `destination` is missing, if any
    pub fn shortfall(&self, destination: Destination) -> Option<u64> {
        let free = self.free_bytes(destination);
        (free < self.required_bytes).then(|| self.required_bytes - free)
    }

    pub fn fits_both(&self) -> bool {
        self.shortfall(Destination::Archive).is_none() && self.shortfall(Destination::Proxy).is_none()
    }
}

/// Outcome of one destination's copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    pub exit_code: CopyExit,
    pub log_path: PathBuf,
}

impl CopyReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code.is_success()
    }
}

/// Outcome of one card ingest, built once and never changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub ok: bool,
    pub reason: IngestReason,
    pub archive: Option<CopyReport>,
    pub proxy: Option<CopyReport>,
    pub space: Option<SpaceReport>,
    pub message: String,
}

impl IngestResult {
    /// Neither copy started because at least one destination is short
    pub fn not_enough_space(space: SpaceReport) -> Self {
        let mut short = Vec::new();
        for destination in [Destination::Archive, Destination::Proxy] {
            if let Some(missing) = space.shortfall(destination) {
                short.push(format!(
                    "{} is short by {} (has {})",
                    destination,
                    format_gb(missing),
                    format_gb(space.free_bytes(destination))
                ));
            }
        }

        let message = format!(
            "Need ~{} for this card. {}.",
            format_gb(space.required_bytes),
            short.join("; ")
        );

        Self {
            ok: false,
            reason: IngestReason::NotEnoughSpace,
            archive: None,
            proxy: None,
            space: Some(space),
            message,
        }
    }

    /// Both copies ran; the result depends on their exit codes
    pub fn from_copies(space: SpaceReport, archive: CopyReport, proxy: CopyReport) -> Self {
        if archive.succeeded() && proxy.succeeded() {
            Self {
                ok: true,
                reason: IngestReason::Ok,
                message: "Copy OK to both destinations.".to_string(),
                archive: Some(archive),
                proxy: Some(proxy),
                space: Some(space),
            }
        } else {
            Self {
                ok: false,
                reason: IngestReason::CopyFailed,
                message: format!(
                    "Copy failed. Archive exit={}, SSD exit={}. See logs.",
                    archive.exit_code, proxy.exit_code
                ),
                archive: Some(archive),
                proxy: Some(proxy),
                space: Some(space),
            }
        }
    }

    pub fn log_paths(&self) -> Vec<&PathBuf> {
        self.archive
            .iter()
            .chain(self.proxy.iter())
            .map(|report| &report.log_path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space::GIB;

    fn report(code: i32, name: &str) -> CopyReport {
        CopyReport {
            exit_code: CopyExit(code),
            log_path: PathBuf::from(name),
        }
    }

    fn space(archive_free: u64, proxy_free: u64) -> SpaceReport {
        SpaceReport {
            source_used_bytes: 100 * GIB,
            required_bytes: 105 * GIB,
            archive_free_bytes: archive_free,
            proxy_free_bytes: proxy_free,
        }
    }

    #[test]
    fn reasons_serialize_as_wire_codes() {
        assert_eq!(serde_json::to_string(&IngestReason::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&IngestReason::NotEnoughSpace).unwrap(),
            "\"NOT_ENOUGH_SPACE\""
        );
        assert_eq!(
            serde_json::to_string(&IngestReason::CopyFailed).unwrap(),
            "\"ROBOCOPY_FAILED\""
        );
    }

    #[test]
    fn shortage_message_names_only_the_short_side() {
        let result = IngestResult::not_enough_space(space(104 * GIB, 90 * GIB));

        assert!(!result.ok);
        assert_eq!(result.reason, IngestReason::NotEnoughSpace);
        assert!(result.message.contains("Need ~105.0 GB"));
        assert!(result.message.contains("Proxy SSD is short by 15.0 GB (has 90.0 GB)"));
        assert!(result.message.contains("Archive is short by 1.0 GB"));
    }

    #[test]
    fn shortage_message_skips_sides_with_room() {
        let result = IngestResult::not_enough_space(space(200 * GIB, 90 * GIB));
        assert!(!result.message.contains("Archive"));
        assert!(result.archive.is_none() && result.proxy.is_none());
    }

    #[test]
    fn mixed_exit_codes_never_succeed() {
        for (a, p) in [(1, 8), (8, 1), (0, 16), (9, 0)] {
            let result = IngestResult::from_copies(space(GIB, GIB), report(a, "a.log"), report(p, "p.log"));
            assert!(!result.ok);
            assert_eq!(result.reason, IngestReason::CopyFailed);
            assert_eq!(result.archive.as_ref().unwrap().exit_code, CopyExit(a));
            assert_eq!(result.proxy.as_ref().unwrap().exit_code, CopyExit(p));
            assert!(result.message.contains(&format!("Archive exit={}, SSD exit={}", a, p)));
        }
    }

    #[test]
    fn both_low_codes_succeed() {
        let result = IngestResult::from_copies(space(GIB, GIB), report(1, "a.log"), report(3, "p.log"));
        assert!(result.ok);
        assert_eq!(result.reason, IngestReason::Ok);
        assert_eq!(result.log_paths().len(), 2);
    }
}
