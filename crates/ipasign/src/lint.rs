//! Best-effort `Info.plist` validation with `plutil -lint`.
//!
//! Validation never fails a run: the pipeline logs [`LintError`] as a warning
//! and records a [`LintOutcome`] in the run report.

use crate::tools::ToolLocator;
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use thiserror::Error;

const PLUTIL: &str = "plutil";

/// Why a lint attempt did not pass.
#[derive(Debug, Error)]
pub enum LintError {
    /// `plutil` is not on the search path.
    #[error("{0} not found")]
    ToolNotFound(&'static str),

    /// `plutil` could not be started.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// `plutil` exited unsuccessfully.
    #[error("descriptor rejected ({status}): {message}")]
    Rejected { status: String, message: String },
}

/// Lint result as recorded in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintOutcome {
    Passed,
    /// Linting disabled, or the tool was not available.
    Skipped,
    Failed,
}

impl fmt::Display for LintOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LintOutcome::Passed => "passed",
            LintOutcome::Skipped => "skipped",
            LintOutcome::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl From<&Result<(), LintError>> for LintOutcome {
    fn from(result: &Result<(), LintError>) -> Self {
        match result {
            Ok(()) => LintOutcome::Passed,
            Err(LintError::ToolNotFound(_)) => LintOutcome::Skipped,
            Err(_) => LintOutcome::Failed,
        }
    }
}

/// Runs `plutil -lint` on property lists.
#[derive(Debug, Clone)]
pub struct Linter {
    locator: ToolLocator,
}

impl Linter {
    pub fn new(locator: ToolLocator) -> Self {
        Self { locator }
    }

    /// Lint the property list at `path`.
    pub fn lint(&self, path: &Path) -> Result<(), LintError> {
        let plutil = self
            .locator
            .find(PLUTIL)
            .ok_or(LintError::ToolNotFound(PLUTIL))?;

        let output = self
            .locator
            .run(&plutil, [OsStr::new("-lint"), path.as_os_str()])
            .map_err(|source| LintError::Spawn {
                tool: PLUTIL,
                source,
            })?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(LintError::Rejected {
                status: output.status.to_string(),
                message: message.trim().to_string(),
            });
        }

        Ok(())
    }
}
