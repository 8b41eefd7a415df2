//! # Project Registry
//!
//! Small JSON list of recent projects, used to offer "add cards to an
//! existing project" without retyping names.
//!
//! ```json
//! [
//!   {"client": "Iriya", "project": "Yom_HaAtsmaut", "last_updated": "2026-01-10"}
//! ]
//! ```

use crate::error::{IngestError, Result, SessionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One known project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub client: String,
    pub project: String,
    /// ISO date of the last session, may be empty
    #[serde(default)]
    pub last_updated: String,
}

impl ProjectSummary {
    pub fn new(client: impl Into<String>, project: impl Into<String>, last_updated: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            project: project.into(),
            last_updated: last_updated.into(),
        }
    }

    fn same_project(&self, other: &ProjectSummary) -> bool {
        self.client == other.client && self.project == other.project
    }
}

fn text_field(item: &serde_json::Map<String, Value>, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// Recent projects, most recent first.
///
/// A missing or unreadable file gives an empty list. Entries that are not
/// objects or lack a client or project are skipped.
pub fn load_recent_projects(registry_path: &Path) -> Vec<ProjectSummary> {
    let text = match fs::read_to_string(registry_path) {
        Ok(text) => text,
        Err(_) => return Vec::new(),
    };

    let raw: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %registry_path.display(), error = %e, "ignoring invalid project registry");
            return Vec::new();
        }
    };

    let Value::Array(items) = raw else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let client = text_field(item, "client");
            let project = text_field(item, "project");
            if client.is_empty() || project.is_empty() {
                return None;
            }
            Some(ProjectSummary {
                client,
                project,
                last_updated: text_field(item, "last_updated"),
            })
        })
        .collect()
}

/// Find a recent project, ignoring case and outer whitespace
pub fn find_project(registry_path: &Path, client: &str, project: &str) -> Option<ProjectSummary> {
    let client = client.trim().to_lowercase();
    let project = project.trim().to_lowercase();
    load_recent_projects(registry_path)
        .into_iter()
        .find(|p| p.client.to_lowercase() == client && p.project.to_lowercase() == project)
}

/// The recorded project that new cards are being added to.
///
/// Adding to a project that was never recorded is refused, since its folder
/// name would not match what is already on the drives.
pub fn existing_project(registry_path: &Path, client: &str, project: &str) -> Result<ProjectSummary> {
    find_project(registry_path, client, project).ok_or_else(|| {
        SessionError::InvalidJob(format!(
            "{} / {} is not a recent project (see `card-ingest projects`)",
            client.trim(),
            project.trim()
        ))
        .into()
    })
}

/// Insert or refresh a project and move it to the front
pub fn record_project(registry_path: &Path, summary: ProjectSummary) -> Result<()> {
    let mut projects = load_recent_projects(registry_path);
    projects.retain(|p| !p.same_project(&summary));
    projects.insert(0, summary);

    if let Some(parent) = registry_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                IngestError::Config(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }

    let json = serde_json::to_string_pretty(&projects)
        .map_err(|e| IngestError::Config(format!("cannot encode project registry: {}", e)))?;
    fs::write(registry_path, json).map_err(|e| {
        IngestError::Config(format!("cannot write {}: {}", registry_path.display(), e))
    })?;

    tracing::debug!(path = %registry_path.display(), count = projects.len(), "project registry updated");
    Ok(())
}
