//! Destination folder layout for one card.
//!
//! ```text
//! <archive>/<base>/<client_project>/Footage/<date>/SD<n>
//! <archive>/<base>/<client_project>/Footage/<date>/_logs/SD<n>_archive_robocopy.log
//! <proxy>/<base>/<client_project>/Proxy/<date>/SD<n>
//! <proxy>/<base>/<client_project>/Proxy/<date>/_logs/SD<n>_ssd_robocopy.log
//! ```

use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the per-date log folder next to the card folders
pub const LOGS_DIR_NAME: &str = "_logs";

/// The two places every card is copied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Archive,
    Proxy,
}

impl Destination {
    /// Folder under the project holding this destination's cards
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::Archive => "Footage",
            Self::Proxy => "Proxy",
        }
    }

    /// Tag used in log file names
    pub fn log_tag(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Proxy => "ssd",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "Archive"),
            Self::Proxy => write!(f, "Proxy SSD"),
        }
    }
}

/// Paths for one destination of one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationPaths {
    pub destination: Destination,
    pub card_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub log_file: PathBuf,
}

impl DestinationPaths {
    fn derive(
        destination: Destination,
        root: &Path,
        base_folder: &str,
        client_project: &str,
        date: &str,
        card_name: &str,
    ) -> Self {
        let date_dir = root
            .join(base_folder)
            .join(client_project)
            .join(destination.folder_name())
            .join(date);
        let logs_dir = date_dir.join(LOGS_DIR_NAME);
        let log_file = logs_dir.join(format!("{}_{}_robocopy.log", card_name, destination.log_tag()));

        Self {
            destination,
            card_dir: date_dir.join(card_name),
            logs_dir,
            log_file,
        }
    }

    /// Create the card and log folders, tolerating ones that already exist
    pub fn ensure(&self) -> Result<(), LayoutError> {
        for dir in [&self.card_dir, &self.logs_dir] {
            fs::create_dir_all(dir).map_err(|source| LayoutError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Archive and proxy paths for one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLayout {
    pub card_name: String,
    pub archive: DestinationPaths,
    pub proxy: DestinationPaths,
}

impl CardLayout {
    /// Derive the layout. Nothing is touched on disk.
    pub fn new(
        archive_root: &Path,
        proxy_root: &Path,
        base_folder: &str,
        client_project: &str,
        date: &str,
        card_index: u32,
    ) -> Result<Self, LayoutError> {
        if card_index == 0 {
            return Err(LayoutError::InvalidCardIndex { index: card_index });
        }
        if normalize_root(archive_root) == normalize_root(proxy_root) {
            return Err(LayoutError::SameDestination {
                path: normalize_root(archive_root),
            });
        }
        let card_name = card_name(card_index);

        Ok(Self {
            archive: DestinationPaths::derive(
                Destination::Archive,
                archive_root,
                base_folder,
                client_project,
                date,
                &card_name,
            ),
            proxy: DestinationPaths::derive(
                Destination::Proxy,
                proxy_root,
                base_folder,
                client_project,
                date,
                &card_name,
            ),
            card_name,
        })
    }

    /// Create all four folders before any copy starts
    pub fn ensure(&self) -> Result<(), LayoutError> {
        self.archive.ensure()?;
        self.proxy.ensure()
    }
}

/// `SD1`, `SD2`, ...
pub fn card_name(card_index: u32) -> String {
    format!("SD{}", card_index)
}

/// Lexically normalize a root path.
///
/// Drops `.` components and trailing separators. Nothing is resolved on
/// disk, so roots of unplugged drives normalize too.
pub fn normalize_root(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout(root: &Path) -> CardLayout {
        CardLayout::new(
            &root.join("archive"),
            &root.join("proxy"),
            "Cactus",
            "Iriya_-_Yom_HaAtsmaut",
            "2026-01-15",
            1,
        )
        .unwrap()
    }

    #[test]
    fn layout_follows_footage_and_proxy_trees() {
        let layout = layout(Path::new("/drives"));

        assert_eq!(
            layout.archive.card_dir,
            PathBuf::from("/drives/archive/Cactus/Iriya_-_Yom_HaAtsmaut/Footage/2026-01-15/SD1")
        );
        assert_eq!(
            layout.proxy.card_dir,
            PathBuf::from("/drives/proxy/Cactus/Iriya_-_Yom_HaAtsmaut/Proxy/2026-01-15/SD1")
        );
        assert_eq!(
            layout.archive.log_file,
            PathBuf::from(
                "/drives/archive/Cactus/Iriya_-_Yom_HaAtsmaut/Footage/2026-01-15/_logs/SD1_archive_robocopy.log"
            )
        );
        assert_eq!(
            layout.proxy.log_file,
            PathBuf::from(
                "/drives/proxy/Cactus/Iriya_-_Yom_HaAtsmaut/Proxy/2026-01-15/_logs/SD1_ssd_robocopy.log"
            )
        );
    }

    #[test]
    fn logs_sit_beside_card_folders() {
        let layout = layout(Path::new("/drives"));
        assert_eq!(layout.archive.logs_dir.parent(), layout.archive.card_dir.parent());
        assert_eq!(layout.proxy.logs_dir.parent(), layout.proxy.card_dir.parent());
    }

    #[test]
    fn one_root_for_both_destinations_is_rejected() {
        let result = CardLayout::new(
            Path::new("/mnt/archive/"),
            Path::new("/mnt/archive"),
            "Cactus",
            "Iriya_-_Purim",
            "2026-01-15",
            1,
        );
        assert!(matches!(
            result,
            Err(LayoutError::SameDestination { path }) if path == Path::new("/mnt/archive")
        ));
    }

    #[test]
    fn zero_card_index_is_rejected() {
        let result = CardLayout::new(Path::new("/a"), Path::new("/p"), "b", "c", "d", 0);
        assert!(matches!(result, Err(LayoutError::InvalidCardIndex { index: 0 })));
    }

    #[test]
    fn ensure_creates_all_folders_and_is_repeatable() {
        let temp = TempDir::new().unwrap();
        let layout = layout(temp.path());

        layout.ensure().unwrap();
        layout.ensure().unwrap();

        assert!(layout.archive.card_dir.is_dir());
        assert!(layout.archive.logs_dir.is_dir());
        assert!(layout.proxy.card_dir.is_dir());
        assert!(layout.proxy.logs_dir.is_dir());
    }

    #[test]
    fn normalize_drops_trailing_separator_and_dot() {
        assert_eq!(normalize_root(Path::new("/media/card/")), PathBuf::from("/media/card"));
        assert_eq!(normalize_root(Path::new("/media/./card")), PathBuf::from("/media/card"));
        assert_eq!(normalize_root(Path::new("./")), PathBuf::from("."));
    }
}
