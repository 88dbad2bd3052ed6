//! Lookup and invocation of external executables.
//!
//! Signing and linting are delegated to system tools (`codesign`, `ldid`,
//! `plutil`). A [`ToolLocator`] resolves them by name on a search path at
//! invocation time and runs them with captured output.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Resolves executables by name on a search path.
///
/// # Examples
///
/// ```no_run
/// use ipasign::tools::ToolLocator;
///
/// let locator = ToolLocator::from_env();
/// if let Some(codesign) = locator.find("codesign") {
///     println!("codesign at {}", codesign.display());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    /// Explicit search path; `None` means the process `PATH`.
    search_path: Option<OsString>,
}

impl ToolLocator {
    /// Search the process `PATH`, read at every lookup.
    pub fn from_env() -> Self {
        Self { search_path: None }
    }

    /// Search only the given directories.
    ///
    /// The argument uses the platform `PATH` syntax, so it can be built with
    /// [`std::env::join_paths`].
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    /// Find the first executable named `name` on the search path.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let search_path = match &self.search_path {
            Some(path) => path.clone(),
            None => std::env::var_os("PATH")?,
        };

        std::env::split_paths(&search_path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .flat_map(|dir| candidate_names(name).into_iter().map(move |n| dir.join(n)))
            .find(|candidate| is_executable(candidate))
    }

    /// Run a resolved executable and capture its output.
    ///
    /// Arguments are passed through as given, so paths need not be UTF-8.
    /// Output is logged at debug level and otherwise discarded by callers.
    pub fn run<I, S>(&self, program: &Path, args: I) -> io::Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        tracing::debug!(program = %program.display(), ?args, "running external tool");

        let output = Command::new(program).args(args).output()?;

        tracing::debug!(
            program = %program.display(),
            status = %output.status,
            stdout = %String::from_utf8_lossy(&output.stdout).trim(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "external tool finished"
        );

        Ok(output)
    }
}

#[cfg(windows)]
fn candidate_names(name: &str) -> Vec<String> {
    vec![format!("{name}.exe"), name.to_string()]
}

#[cfg(not(windows))]
fn candidate_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
