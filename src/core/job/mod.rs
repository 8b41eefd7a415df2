//! Job configuration for one ingest session.

use crate::core::layout::normalize_root;
use crate::error::SessionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Longest project folder token we will create on disk
const MAX_PROJECT_FOLDER_LEN: usize = 80;

/// Whether the session starts a new project or adds cards to an existing one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    #[default]
    New,
    Existing,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Existing => "existing",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the operator chose before the first card goes in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub client_name: String,
    pub project_name: String,
    pub num_cards: u32,
    pub archive_path: PathBuf,
    pub proxy_path: PathBuf,
    /// e.g. "E: - MyBook 2"
    pub archive_drive_display: String,
    /// e.g. "F: - PROXY_B"
    pub proxy_drive_display: String,
    pub keep_originals_on_proxy: bool,
    pub mode: JobMode,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            client_name: String::new(),
            project_name: String::new(),
            num_cards: 1,
            archive_path: PathBuf::new(),
            proxy_path: PathBuf::new(),
            archive_drive_display: String::new(),
            proxy_drive_display: String::new(),
            keep_originals_on_proxy: true,
            mode: JobMode::New,
        }
    }
}

impl JobConfig {
    /// Filesystem-safe `<client>_-_<project>` token
    pub fn safe_project_folder(&self) -> String {
        safe_project_folder(&self.client_name, &self.project_name)
    }

    /// Archive column value for the ledger
    pub fn archive_label(&self) -> String {
        if self.archive_drive_display.is_empty() {
            self.archive_path.display().to_string()
        } else {
            self.archive_drive_display.clone()
        }
    }

    /// Proxy column value for the ledger
    pub fn proxy_label(&self) -> String {
        if self.proxy_drive_display.is_empty() {
            self.proxy_path.display().to_string()
        } else {
            self.proxy_drive_display.clone()
        }
    }

    /// Check the job is complete enough to start ingesting
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.client_name.trim().is_empty() || self.project_name.trim().is_empty() {
            return Err(SessionError::InvalidJob(
                "client and project names are required".to_string(),
            ));
        }
        if self.num_cards == 0 {
            return Err(SessionError::InvalidJob(
                "at least one card is required".to_string(),
            ));
        }
        if self.archive_path.as_os_str().is_empty() || self.proxy_path.as_os_str().is_empty() {
            return Err(SessionError::InvalidJob(
                "both archive and proxy destinations are required".to_string(),
            ));
        }
        if normalize_root(&self.archive_path) == normalize_root(&self.proxy_path) {
            return Err(SessionError::InvalidJob(
                "archive and proxy locations should be different".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sanitize client and project names into one folder token.
///
/// Whitespace runs become `_`, anything outside `[A-Za-z0-9_-]` is dropped,
/// and the result is capped at 80 characters.
pub fn safe_project_folder(client: &str, project: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    let disallowed = DISALLOWED.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]").unwrap());

    let raw = format!("{}_-_{}", client, project);
    let raw = whitespace.replace_all(raw.trim(), "_");
    let raw = disallowed.replace_all(&raw, "");
    let token: String = raw.chars().take(MAX_PROJECT_FOLDER_LEN).collect();

    if token.is_empty() {
        "Untitled_Project".to_string()
    } else {
        token
    }
}
