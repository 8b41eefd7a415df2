//! Copy backend that shells out to robocopy.

use super::{CopyExit, CopyJob, CopyRunner};
use crate::error::CopyError;
use std::ffi::OsString;
use std::process::{Command, Stdio};

/// Runs the external copy utility and waits for it to exit
#[derive(Debug, Clone)]
pub struct RobocopyRunner {
    program: OsString,
}

impl RobocopyRunner {
    pub fn new() -> Self {
        Self::with_program("robocopy")
    }

    /// Use a different executable (a full path, or a wrapper script)
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the command line for a job without running it
    pub fn command(&self, job: &CopyJob) -> Command {
        let options = &job.options;
        let mut command = Command::new(&self.program);

        // Paths go in as separate args so spaces need no quoting
        command
            .arg(&job.source)
            .arg(&job.destination)
            .arg("/E")
            .arg("/COPY:DAT")
            .arg("/DCOPY:T")
            .arg(format!("/R:{}", options.retries))
            .arg(format!("/W:{}", options.retry_wait.as_secs()))
            .arg(format!("/MT:{}", options.threads.max(1)));

        if options.skip_junctions {
            command.arg("/XJ");
        }

        let mut log_arg = OsString::from("/LOG+:");
        log_arg.push(job.log_path.as_os_str());
        command.arg("/NP").arg(log_arg);

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        command
    }
}

impl Default for RobocopyRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyRunner for RobocopyRunner {
    fn run(&self, job: &CopyJob) -> Result<CopyExit, CopyError> {
        let program = self.program.to_string_lossy().to_string();

        let mut child = self
            .command(job)
            .spawn()
            .map_err(|source| CopyError::Spawn {
                program: program.clone(),
                source,
            })?;

        tracing::debug!(
            pid = child.id(),
            source = %job.source.display(),
            destination = %job.destination.display(),
            "copy process started"
        );

        let status = child
            .wait()
            .map_err(|source| CopyError::Wait { program, source })?;

        // Killed by a signal: there is no code, treat it as fatal
        Ok(status.code().map(CopyExit).unwrap_or(CopyExit::FATAL))
    }
}
