//! # Configuration
//!
//! Persistent operator settings and the default locations of the files the
//! tool keeps between runs.

use crate::core::session::DEFAULT_BASE_FOLDER;
use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder under the platform data directory
pub const APP_DIR_NAME: &str = "card-ingest";

/// Remembered choices from the last session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub last_archive_root: String,
    pub last_proxy_root: String,
    pub base_folder_name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_archive_root: String::new(),
            last_proxy_root: String::new(),
            base_folder_name: DEFAULT_BASE_FOLDER.to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings, falling back to defaults if the file is missing or invalid
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str::<AppSettings>(&text) {
            Ok(mut settings) => {
                settings.last_archive_root = settings.last_archive_root.trim().to_string();
                settings.last_proxy_root = settings.last_proxy_root.trim().to_string();
                if settings.base_folder_name.trim().is_empty() {
                    settings.base_folder_name = DEFAULT_BASE_FOLDER.to_string();
                }
                settings
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid settings file");
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating the parent folder
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    IngestError::Config(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| IngestError::Config(format!("cannot encode settings: {}", e)))?;
        fs::write(path, json)
            .map_err(|e| IngestError::Config(format!("cannot write {}: {}", path.display(), e)))
    }
}

/// Where settings, the ledger and the project registry live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub settings: PathBuf,
    pub ledger: PathBuf,
    pub projects: PathBuf,
}

impl AppPaths {
    /// Paths under `root`
    pub fn in_dir(root: &Path) -> Self {
        Self {
            settings: root.join("settings.json"),
            ledger: root.join("ledger.csv"),
            projects: root.join("projects.json"),
        }
    }

    /// Platform data directory, or the working directory if there is none
    pub fn resolve() -> Self {
        let root = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR_NAME));
        Self::in_dir(&root)
    }

    /// Replace any path the user gave explicitly
    pub fn with_overrides(
        mut self,
        settings: Option<PathBuf>,
        ledger: Option<PathBuf>,
        projects: Option<PathBuf>,
    ) -> Self {
        if let Some(path) = settings {
            self.settings = path;
        }
        if let Some(path) = ledger {
            self.ledger = path;
        }
        if let Some(path) = projects {
            self.projects = path;
        }
        self
    }
}
