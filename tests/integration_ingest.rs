//! Integration tests for the card ingest with the native copier.
//!
//! These tests copy real files between temp folders and cover:
//! - Both destinations receiving an identical tree
//! - Logs landing beside the card folders
//! - Reruns copying nothing new
//! - Space shortfalls leaving the destinations untouched

use assert_fs::prelude::*;
use assert_fs::TempDir;
use card_ingest::core::copier::{CopyExit, NativeCopyRunner};
use card_ingest::core::ingest::{CardIngest, IngestReason, IngestRequest};
use card_ingest::core::space::{DiskSpace, SpaceQuery, GIB};
use card_ingest::error::SpaceError;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// Card and destinations on separate "volumes" with fixed figures
struct StaticSpace {
    card_used: u64,
    archive_free: u64,
    proxy_free: u64,
}

impl SpaceQuery for StaticSpace {
    fn space(&self, root: &Path) -> Result<DiskSpace, SpaceError> {
        let name = root.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        Ok(match name {
            "card" => DiskSpace::new(self.card_used + GIB, GIB),
            "archive" => DiskSpace::new(10_000 * GIB, self.archive_free),
            "proxy" => DiskSpace::new(10_000 * GIB, self.proxy_free),
            _ => {
                return Err(SpaceError::NoVolume {
                    path: root.to_path_buf(),
                })
            }
        })
    }
}

fn roomy() -> StaticSpace {
    StaticSpace {
        card_used: 4 * GIB,
        archive_free: 100 * GIB,
        proxy_free: 100 * GIB,
    }
}

fn make_card(temp: &TempDir) {
    let card = temp.child("card");
    card.child("DCIM/100MSDCF/C0001.MP4").write_binary(&[7u8; 4096]).unwrap();
    card.child("DCIM/100MSDCF/C0002.MP4").write_binary(&[9u8; 2048]).unwrap();
    card.child("PRIVATE/M4ROOT/STATUS.BIN").write_str("status").unwrap();
    card.child("PRIVATE/EMPTY").create_dir_all().unwrap();
}

fn request(temp: &TempDir, card_index: u32) -> IngestRequest {
    IngestRequest {
        source_root: temp.path().join("card"),
        archive_root: temp.path().join("archive"),
        proxy_root: temp.path().join("proxy"),
        base_folder_name: "Cactus".to_string(),
        client_project: "Iriya_-_Yom_HaAtsmaut".to_string(),
        ingest_date: "2026-01-15".to_string(),
        card_index,
    }
}

fn ingest(space: StaticSpace) -> CardIngest {
    CardIngest::builder()
        .space_query(Box::new(space))
        .copier(Box::new(NativeCopyRunner::new()))
        .build()
}

#[test]
fn card_lands_on_both_drives() {
    let temp = TempDir::new().unwrap();
    make_card(&temp);

    let result = ingest(roomy()).ingest(&request(&temp, 2)).unwrap();

    assert!(result.ok, "{}", result.message);
    assert_eq!(result.reason, IngestReason::Ok);

    for card_dir in [
        "archive/Cactus/Iriya_-_Yom_HaAtsmaut/Footage/2026-01-15/SD2",
        "proxy/Cactus/Iriya_-_Yom_HaAtsmaut/Proxy/2026-01-15/SD2",
    ] {
        let dir = temp.child(card_dir);
        dir.child("DCIM/100MSDCF/C0001.MP4").assert(predicate::path::is_file());
        dir.child("PRIVATE/M4ROOT/STATUS.BIN").assert("status");
        dir.child("PRIVATE/EMPTY").assert(predicate::path::is_dir());
    }

    temp.child("archive/Cactus/Iriya_-_Yom_HaAtsmaut/Footage/2026-01-15/_logs/SD2_archive_robocopy.log")
        .assert(predicate::path::is_file());
    temp.child("proxy/Cactus/Iriya_-_Yom_HaAtsmaut/Proxy/2026-01-15/_logs/SD2_ssd_robocopy.log")
        .assert(predicate::path::is_file());

    // The card itself is never written to
    assert_eq!(fs::read_dir(temp.path().join("card")).unwrap().count(), 2);
}

#[test]
fn rerun_copies_nothing_new() {
    let temp = TempDir::new().unwrap();
    make_card(&temp);
    let ingest = ingest(roomy());

    let first = ingest.ingest(&request(&temp, 1)).unwrap();
    let second = ingest.ingest(&request(&temp, 1)).unwrap();

    assert_eq!(first.archive.unwrap().exit_code, CopyExit(CopyExit::FILES_COPIED));
    let archive = second.archive.unwrap();
    let proxy = second.proxy.unwrap();
    assert_eq!(archive.exit_code, CopyExit::NO_CHANGE);
    assert_eq!(proxy.exit_code, CopyExit::NO_CHANGE);
    assert!(second.ok);

    // Both runs are in the same log
    let log = fs::read_to_string(&archive.log_path).unwrap();
    assert_eq!(log.matches("Exit code").count(), 2);
}

#[test]
fn shortfall_touches_nothing_but_folders() {
    let temp = TempDir::new().unwrap();
    make_card(&temp);
    let space = StaticSpace {
        card_used: 100 * GIB,
        archive_free: 104 * GIB,
        proxy_free: 90 * GIB,
    };

    let result = ingest(space).ingest(&request(&temp, 1)).unwrap();

    assert_eq!(result.reason, IngestReason::NotEnoughSpace);
    let card_dir = temp.child("archive/Cactus/Iriya_-_Yom_HaAtsmaut/Footage/2026-01-15/SD1");
    card_dir.assert(predicate::path::is_dir());
    assert_eq!(fs::read_dir(card_dir.path()).unwrap().count(), 0);
    temp.child("proxy/Cactus/Iriya_-_Yom_HaAtsmaut/Proxy/2026-01-15/_logs/SD1_ssd_robocopy.log")
        .assert(predicate::path::missing());
}

#[test]
fn missing_card_fails_both_copies() {
    let temp = TempDir::new().unwrap();
    let mut req = request(&temp, 1);
    req.source_root = temp.path().join("gone").join("card");

    let result = ingest(roomy()).ingest(&req).unwrap();

    assert_eq!(result.reason, IngestReason::CopyFailed);
    assert_eq!(result.archive.unwrap().exit_code, CopyExit::FATAL);
    assert_eq!(result.proxy.unwrap().exit_code, CopyExit::FATAL);
}

#[test]
fn extra_files_on_destination_still_succeed() {
    let temp = TempDir::new().unwrap();
    make_card(&temp);
    temp.child("archive/Cactus/Iriya_-_Yom_HaAtsmaut/Footage/2026-01-15/SD1/stray.txt")
        .write_str("left over")
        .unwrap();

    let result = ingest(roomy()).ingest(&request(&temp, 1)).unwrap();

    let code = result.archive.as_ref().unwrap().exit_code.code();
    assert_eq!(code & CopyExit::EXTRA_FILES, CopyExit::EXTRA_FILES);
    assert!(result.ok);
}
