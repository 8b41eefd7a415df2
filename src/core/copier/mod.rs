//! # Copier Module
//!
//! Recursive, attribute-preserving directory copies.
//!
//! ## Backends
//! - `RobocopyRunner` - spawns the Windows copy utility
//! - `NativeCopyRunner` - in-process equivalent for other platforms
//!
//! Both report a robocopy-style exit code: `0..=7` means the copy is
//! complete (bits describe what changed), `8` and above means at least one
//! file could not be copied.

mod native;
mod robocopy;

pub use native::NativeCopyRunner;
pub use robocopy::RobocopyRunner;

use crate::error::CopyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Tuning for a single copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOptions {
    /// Retries for a locked or failing file
    pub retries: u32,
    /// Wait between retries
    pub retry_wait: Duration,
    /// Parallel file copies. Kept low since two copies run at once.
    pub threads: usize,
    /// Do not descend into junctions/symlinked directories
    pub skip_junctions: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_wait: Duration::from_secs(2),
            threads: 4,
            skip_junctions: true,
        }
    }
}

/// One source tree copied to one destination tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Appended to, never truncated
    pub log_path: PathBuf,
    pub options: CopyOptions,
}

/// Exit code of a finished copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CopyExit(pub i32);

impl CopyExit {
    /// Nothing needed copying
    pub const NO_CHANGE: CopyExit = CopyExit(0);
    /// Bit set when at least one file was copied
    pub const FILES_COPIED: i32 = 1;
    /// Bit set when the destination holds files the source does not
    pub const EXTRA_FILES: i32 = 2;
    /// Bit set when at least one file failed
    pub const FAILED_FILES: i32 = 8;
    /// Nothing could be copied at all
    pub const FATAL: CopyExit = CopyExit(16);

    pub fn code(&self) -> i32 {
        self.0
    }

    /// Codes 0..=7 only describe what changed; 8+ carries real failures
    pub fn is_success(&self) -> bool {
        (0..=7).contains(&self.0)
    }
}

impl fmt::Display for CopyExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for copy backends
///
/// Implementations must be callable from two threads at once, one per
/// destination.
pub trait CopyRunner: Send + Sync {
    /// Run the copy to completion and report its exit code.
    ///
    /// Returns `Err` only when the copy could not run at all.
    fn run(&self, job: &CopyJob) -> Result<CopyExit, CopyError>;
}

/// Which backend a front-end asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopierKind {
    Robocopy,
    Native,
}

impl CopierKind {
    /// Robocopy on Windows, the native copier elsewhere
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Robocopy
        } else {
            Self::Native
        }
    }

    pub fn build(&self) -> Box<dyn CopyRunner> {
        match self {
            Self::Robocopy => Box::new(RobocopyRunner::new()),
            Self::Native => Box::new(NativeCopyRunner::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_band_is_success() {
        for code in 0..=7 {
            assert!(CopyExit(code).is_success(), "code {} should succeed", code);
        }
    }

    #[test]
    fn eight_and_above_is_failure() {
        for code in [8, 9, 10, 15, 16, 255] {
            assert!(!CopyExit(code).is_success(), "code {} should fail", code);
        }
    }

    #[test]
    fn negative_codes_are_failures() {
        assert!(!CopyExit(-1).is_success());
    }

    #[test]
    fn default_options_match_parallel_copy_tuning() {
        let options = CopyOptions::default();
        assert_eq!(options.retries, 2);
        assert_eq!(options.retry_wait, Duration::from_secs(2));
        assert_eq!(options.threads, 4);
        assert!(options.skip_junctions);
    }
}
