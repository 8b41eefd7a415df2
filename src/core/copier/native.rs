//! In-process copy backend using walkdir + rayon.
//!
//! Mirrors the robocopy behaviour the ingest relies on: unchanged files
//! (same length and modification time) are skipped, so a rerun after a
//! partial failure only copies what is missing.

use super::{CopyExit, CopyJob, CopyOptions, CopyRunner};
use crate::error::CopyError;
use filetime::FileTime;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use walkdir::WalkDir;

/// Copies directory trees without an external process
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCopyRunner;

impl NativeCopyRunner {
    pub fn new() -> Self {
        Self
    }
}

/// A file found in the source tree
#[derive(Debug)]
struct PlannedFile {
    source: PathBuf,
    destination: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Copied,
    Skipped,
    Failed,
}

/// Append-only log shared by the worker threads
struct CopyLog {
    file: Mutex<File>,
}

impl CopyLog {
    fn open(path: &Path) -> Result<Self, CopyError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| CopyError::LogOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Log write failures never abort a copy
    fn line(&self, message: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", message);
        }
    }
}

impl CopyRunner for NativeCopyRunner {
    fn run(&self, job: &CopyJob) -> Result<CopyExit, CopyError> {
        let log = CopyLog::open(&job.log_path)?;
        log.line("-------------------------------------------------------------------------------");
        log.line(&format!("  Started : {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        log.line(&format!("   Source : {}", job.source.display()));
        log.line(&format!("     Dest : {}", job.destination.display()));
        log.line(&format!(
            "  Options : /E /COPY:DAT /DCOPY:T /R:{} /W:{} /MT:{}{}",
            job.options.retries,
            job.options.retry_wait.as_secs(),
            job.options.threads,
            if job.options.skip_junctions { " /XJ" } else { "" }
        ));

        if !job.source.is_dir() {
            log.line(&format!("ERROR : source {} is not accessible", job.source.display()));
            log.line(&format!("Exit code : {}", CopyExit::FATAL));
            return Ok(CopyExit::FATAL);
        }

        let mut failed = 0usize;
        let (dirs, files) = plan(job, &log, &mut failed);

        for (_, dest_dir) in &dirs {
            if let Err(e) = fs::create_dir_all(dest_dir) {
                log.line(&format!("ERROR : creating {}: {}", dest_dir.display(), e));
                failed += 1;
            }
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(job.options.threads.max(1))
            .build()
            .map_err(|e| CopyError::WorkerPool(e.to_string()))?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|file| copy_with_retries(file, &job.options, &log))
                .collect()
        });

        let copied = outcomes.iter().filter(|o| **o == FileOutcome::Copied).count();
        let skipped = outcomes.iter().filter(|o| **o == FileOutcome::Skipped).count();
        failed += outcomes.iter().filter(|o| **o == FileOutcome::Failed).count();

        // Directory times last, deepest first, since copying touches them
        for (source_dir, dest_dir) in dirs.iter().rev() {
            if let Err(e) = copy_mtime(source_dir, dest_dir) {
                log.line(&format!("WARN : keeping time on {}: {}", dest_dir.display(), e));
            }
        }

        let extra = has_extra_files(&job.destination, &files);

        let mut code = 0;
        if copied > 0 {
            code |= CopyExit::FILES_COPIED;
        }
        if extra {
            code |= CopyExit::EXTRA_FILES;
        }
        if failed > 0 {
            code |= CopyExit::FAILED_FILES;
        }

        log.line(&format!(
            "    Files : {} total, {} copied, {} skipped, {} failed{}",
            files.len(),
            copied,
            skipped,
            failed,
            if extra { ", extras in destination" } else { "" }
        ));
        log.line(&format!("    Ended : {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        log.line(&format!("Exit code : {}", code));

        Ok(CopyExit(code))
    }
}

/// Walk the source and pair every directory and file with its destination
fn plan(
    job: &CopyJob,
    log: &CopyLog,
    failed: &mut usize,
) -> (Vec<(PathBuf, PathBuf)>, Vec<PlannedFile>) {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    let walker = WalkDir::new(&job.source).follow_links(!job.options.skip_junctions);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                log.line(&format!("ERROR : reading source: {}", e));
                *failed += 1;
                continue;
            }
        };

        if entry.path_is_symlink() && job.options.skip_junctions {
            log.line(&format!("  Skipped link : {}", entry.path().display()));
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(&job.source) else {
            continue;
        };
        let destination = job.destination.join(relative);

        if entry.file_type().is_dir() {
            dirs.push((entry.path().to_path_buf(), destination));
        } else if entry.file_type().is_file() {
            files.push(PlannedFile {
                source: entry.path().to_path_buf(),
                destination,
            });
        }
    }

    (dirs, files)
}

fn copy_with_retries(file: &PlannedFile, options: &CopyOptions, log: &CopyLog) -> FileOutcome {
    match is_unchanged(&file.source, &file.destination) {
        Ok(true) => return FileOutcome::Skipped,
        Ok(false) => {}
        Err(e) => {
            log.line(&format!("ERROR : reading {}: {}", file.source.display(), e));
            return FileOutcome::Failed;
        }
    }

    let mut attempt = 0;
    loop {
        match copy_file(&file.source, &file.destination) {
            Ok(()) => return FileOutcome::Copied,
            Err(e) if attempt < options.retries => {
                attempt += 1;
                log.line(&format!(
                    "  Retry {}/{} : {}: {}",
                    attempt,
                    options.retries,
                    file.source.display(),
                    e
                ));
                thread::sleep(options.retry_wait);
            }
            Err(e) => {
                log.line(&format!("ERROR : copying {}: {}", file.source.display(), e));
                return FileOutcome::Failed;
            }
        }
    }
}

/// Same length and same modification time means nothing to do
fn is_unchanged(source: &Path, destination: &Path) -> io::Result<bool> {
    let source_meta = fs::metadata(source)?;
    let Ok(dest_meta) = fs::metadata(destination) else {
        return Ok(false);
    };

    Ok(dest_meta.is_file()
        && dest_meta.len() == source_meta.len()
        && FileTime::from_last_modification_time(&dest_meta)
            == FileTime::from_last_modification_time(&source_meta))
}

/// Copy data, permissions and timestamps
fn copy_file(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)?;

    let meta = fs::metadata(source)?;
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}

fn copy_mtime(source: &Path, destination: &Path) -> io::Result<()> {
    let meta = fs::metadata(source)?;
    filetime::set_file_mtime(destination, FileTime::from_last_modification_time(&meta))
}

/// True if the destination holds files the source does not
fn has_extra_files(destination: &Path, planned: &[PlannedFile]) -> bool {
    let expected: HashSet<&Path> = planned.iter().map(|f| f.destination.as_path()).collect();

    WalkDir::new(destination)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .any(|e| !expected.contains(e.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn job(temp: &TempDir) -> CopyJob {
        CopyJob {
            source: temp.path().join("card"),
            destination: temp.path().join("dest").join("SD1"),
            log_path: temp.path().join("SD1.log"),
            options: CopyOptions {
                retry_wait: Duration::from_millis(1),
                ..CopyOptions::default()
            },
        }
    }

    #[test]
    fn copies_tree_and_reports_files_copied() {
        let temp = TempDir::new().unwrap();
        let job = job(&temp);
        write(&job.source.join("DCIM/100MSDCF/C0001.MP4"), b"clip one");
        write(&job.source.join("PRIVATE/M4ROOT/STATUS.BIN"), b"status");

        let exit = NativeCopyRunner::new().run(&job).unwrap();

        assert_eq!(exit, CopyExit(CopyExit::FILES_COPIED));
        assert_eq!(
            fs::read(job.destination.join("DCIM/100MSDCF/C0001.MP4")).unwrap(),
            b"clip one"
        );
        assert!(job.destination.join("PRIVATE/M4ROOT/STATUS.BIN").is_file());
    }

    #[test]
    fn preserves_modification_time() {
        let temp = TempDir::new().unwrap();
        let job = job(&temp);
        let clip = job.source.join("C0001.MP4");
        write(&clip, b"clip");
        let old = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&clip, old).unwrap();

        NativeCopyRunner::new().run(&job).unwrap();

        let copied = fs::metadata(job.destination.join("C0001.MP4")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&copied), old);
    }

    #[test]
    fn rerun_skips_unchanged_files() {
        let temp = TempDir::new().unwrap();
        let job = job(&temp);
        write(&job.source.join("C0001.MP4"), b"clip");

        let first = NativeCopyRunner::new().run(&job).unwrap();
        let second = NativeCopyRunner::new().run(&job).unwrap();

        assert_eq!(first, CopyExit(CopyExit::FILES_COPIED));
        assert_eq!(second, CopyExit::NO_CHANGE);
    }

    #[test]
    fn extra_destination_files_set_the_extra_bit() {
        let temp = TempDir::new().unwrap();
        let job = job(&temp);
        write(&job.source.join("C0001.MP4"), b"clip");
        write(&job.destination.join("leftover.tmp"), b"old");

        let exit = NativeCopyRunner::new().run(&job).unwrap();

        assert_eq!(exit.code(), CopyExit::FILES_COPIED | CopyExit::EXTRA_FILES);
        assert!(exit.is_success());
    }

    #[test]
    fn missing_source_is_fatal() {
        let temp = TempDir::new().unwrap();
        let job = job(&temp);

        let exit = NativeCopyRunner::new().run(&job).unwrap();

        assert_eq!(exit, CopyExit::FATAL);
        assert!(!exit.is_success());
    }

    #[test]
    fn log_is_appended_across_runs() {
        let temp = TempDir::new().unwrap();
        let job = job(&temp);
        write(&job.source.join("C0001.MP4"), b"clip");

        NativeCopyRunner::new().run(&job).unwrap();
        NativeCopyRunner::new().run(&job).unwrap();

        let log = fs::read_to_string(&job.log_path).unwrap();
        assert_eq!(log.matches("Exit code : ").count(), 2);
        assert!(log.contains("Exit code : 1"));
        assert!(log.contains("Exit code : 0"));
    }

    #[test]
    fn unwritable_log_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut job = job(&temp);
        job.log_path = temp.path().join("missing-dir").join("SD1.log");

        let result = NativeCopyRunner::new().run(&job);
        assert!(matches!(result, Err(CopyError::LogOpen { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped_like_junctions() {
        let temp = TempDir::new().unwrap();
        let job = job(&temp);
        write(&job.source.join("C0001.MP4"), b"clip");
        write(&temp.path().join("elsewhere/big.bin"), b"not on the card");
        std::os::unix::fs::symlink(temp.path().join("elsewhere"), job.source.join("link")).unwrap();

        NativeCopyRunner::new().run(&job).unwrap();

        assert!(job.destination.join("C0001.MP4").is_file());
        assert!(!job.destination.join("link").exists());
    }
}
