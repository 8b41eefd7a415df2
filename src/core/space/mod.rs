//! # Space Module
//!
//! Free/used space lookups and the safety-margin policy.
//!
//! The margin is `max(5% of used, 2 GiB)` on top of the bytes used on the
//! card. A destination is only acceptable when its free space covers the
//! whole requirement.

use crate::error::SpaceError;
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// One gibibyte
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Minimum safety margin added to every card
pub const MARGIN_FLOOR_BYTES: u64 = 2 * GIB;

/// Total and free bytes of one volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl DiskSpace {
    pub fn new(total_bytes: u64, free_bytes: u64) -> Self {
        Self {
            total_bytes,
            free_bytes,
        }
    }

    /// Bytes in use, never negative even if the volume reports odd numbers
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }
}

/// Trait for anything that can report space for a filesystem root
pub trait SpaceQuery: Send + Sync {
    /// Return total and free bytes for the volume holding `root`
    fn space(&self, root: &Path) -> Result<DiskSpace, SpaceError>;
}

/// Bytes a destination must have free to receive a card using `used_bytes`.
pub fn required_with_margin(used_bytes: u64) -> u64 {
    let margin = (used_bytes / 20).max(MARGIN_FLOOR_BYTES);
    used_bytes.saturating_add(margin)
}

/// Format bytes as GB with one decimal, the way operators read drive sizes
pub fn format_gb(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / GIB as f64)
}

/// Space query backed by the OS volume table (via `sysinfo`).
///
/// The volume is the mounted disk with the longest mount point that is a
/// prefix of the queried path, so nested mounts resolve correctly.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoSpaceQuery;

impl SysinfoSpaceQuery {
    pub fn new() -> Self {
        Self
    }
}

impl SpaceQuery for SysinfoSpaceQuery {
    fn space(&self, root: &Path) -> Result<DiskSpace, SpaceError> {
        let target = resolve_for_mount_match(root);
        let disks = Disks::new_with_refreshed_list();

        let mounts: Vec<(PathBuf, DiskSpace)> = disks
            .list()
            .iter()
            .map(|disk| {
                (
                    disk.mount_point().to_path_buf(),
                    DiskSpace::new(disk.total_space(), disk.available_space()),
                )
            })
            .collect();

        let (mount_point, space) =
            best_mount_for_path(&target, &mounts).ok_or_else(|| SpaceError::NoVolume {
                path: root.to_path_buf(),
            })?;

        // Card readers with no media still show up with zero capacity
        if space.total_bytes == 0 {
            return Err(SpaceError::QueryFailed {
                path: root.to_path_buf(),
                reason: format!("volume at {} reports no capacity", mount_point.display()),
            });
        }
        Ok(*space)
    }
}

/// Canonical form of `root` that can be compared with mount points.
///
/// Windows `canonicalize` returns `\\?\G:\...`, whose verbatim prefix never
/// prefix-matches the `G:\` mount points the volume table reports.
fn resolve_for_mount_match(root: &Path) -> PathBuf {
    match fs::canonicalize(root) {
        Ok(path) => strip_verbatim_prefix(&path),
        Err(_) => root.to_path_buf(),
    }
}

/// `\\?\G:\x` becomes `G:\x` and `\\?\UNC\srv\share` becomes `\\srv\share`.
/// Anything else is returned unchanged.
pub(crate) fn strip_verbatim_prefix(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };

    if let Some(rest) = text.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{}", rest));
    }
    if let Some(rest) = text.strip_prefix(r"\\?\") {
        let bytes = rest.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            return PathBuf::from(rest);
        }
    }
    path.to_path_buf()
}

/// Pick the entry whose mount point is the longest prefix of `path`
pub(crate) fn best_mount_for_path<'a, T>(
    path: &Path,
    mounts: &'a [(PathBuf, T)],
) -> Option<&'a (PathBuf, T)> {
    mounts
        .iter()
        .filter(|(mount_point, _)| path.starts_with(mount_point))
        .max_by_key(|(mount_point, _)| mount_point.as_os_str().len())
}
