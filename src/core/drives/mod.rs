//! Mounted volume enumeration.
//!
//! Supplies `(root, label)` pairs plus space figures for picking the card
//! source and the two destinations. The volume hosting the OS is left out.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// A mounted volume the operator can pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveInfo {
    /// Mount point or drive root (e.g. `E:\` or `/media/SONY_CARD`)
    pub root: PathBuf,
    /// Volume label, empty when unknown
    pub label: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
    /// Card readers and USB sticks
    pub removable: bool,
}

impl DriveInfo {
    /// Display string for drive pickers and the ledger
    pub fn display(&self) -> String {
        drive_display(&self.root, &self.label)
    }
}

/// List mounted volumes, excluding the system volume
pub fn list_drives() -> Vec<DriveInfo> {
    let disks = Disks::new_with_refreshed_list();
    let system_root = system_root();

    let mut drives: Vec<DriveInfo> = disks
        .list()
        .iter()
        .filter(|disk| disk.mount_point() != system_root.as_path())
        .map(|disk| DriveInfo {
            root: disk.mount_point().to_path_buf(),
            label: disk.name().to_string_lossy().trim().to_string(),
            total_bytes: disk.total_space(),
            free_bytes: disk.available_space(),
            removable: disk.is_removable(),
        })
        .collect();

    drives.sort_by(|a, b| a.root.cmp(&b.root));
    drives.dedup_by(|a, b| a.root == b.root);
    drives
}

/// Removable volumes only (typically SD card readers)
pub fn list_removable_drives() -> Vec<DriveInfo> {
    list_drives().into_iter().filter(|d| d.removable).collect()
}

/// Format a drive as `E: - MyBook 2`, or `E: - (No Label)` without a label.
///
/// Roots that are not drive letters are shown in full.
pub fn drive_display(root: &Path, label: &str) -> String {
    let root_text = root.to_string_lossy();
    let short = if has_drive_letter(&root_text) {
        root_text.chars().take(2).collect::<String>()
    } else {
        root_text.trim_end_matches(['/', '\\']).to_string()
    };
    let short = if short.is_empty() {
        root_text.to_string()
    } else {
        short
    };

    let label = label.trim();
    if label.is_empty() {
        format!("{} - (No Label)", short)
    } else {
        format!("{} - {}", short, label)
    }
}

fn has_drive_letter(root: &str) -> bool {
    let mut chars = root.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

#[cfg(windows)]
fn system_root() -> PathBuf {
    let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
    PathBuf::from(format!("{}\\", drive))
}

#[cfg(not(windows))]
fn system_root() -> PathBuf {
    PathBuf::from("/")
}
