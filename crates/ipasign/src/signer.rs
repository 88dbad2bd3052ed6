//! External code-signing tools.
//!
//! Signing itself is delegated to the system: `codesign` on macOS, `ldid`
//! elsewhere. Each tool is a [`Signer`]; a [`SignerChain`] tries them in order
//! and stops at the first success.
//!
//! # Examples
//!
//! ```no_run
//! use ipasign::signer::SignerChain;
//! use ipasign::tools::ToolLocator;
//! use std::path::Path;
//!
//! let chain = SignerChain::system(ToolLocator::from_env());
//! let used = chain.sign(Path::new("Payload/MyApp.app"), None)?;
//! println!("signed with {used}");
//! # Ok::<(), ipasign::Error>(())
//! ```

use crate::tools::ToolLocator;
use crate::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::ExitStatus;
use thiserror::Error;

/// Identity passed to `codesign` for ad-hoc signing.
pub const AD_HOC_IDENTITY: &str = "-";

/// Why a single signing attempt did not succeed.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    /// The tool is not on the search path.
    #[error("not found")]
    Unavailable,

    /// The tool was found but could not be started.
    #[error("failed to start: {0}")]
    Spawn(#[from] std::io::Error),

    /// The tool exited unsuccessfully.
    #[error("exited with {0}")]
    Exited(ExitStatus),
}

/// A strategy for signing an app bundle in place.
pub trait Signer {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Sign `bundle` once. `identity` is `None` for ad-hoc signing.
    fn attempt(&self, bundle: &Path, identity: Option<&str>) -> std::result::Result<(), AttemptFailure>;
}

/// Run `program` from the search path and turn its exit status into a result.
fn run_tool(
    locator: &ToolLocator,
    program: &str,
    args: &[&OsStr],
) -> std::result::Result<(), AttemptFailure> {
    let path = locator.find(program).ok_or(AttemptFailure::Unavailable)?;
    let output = locator.run(&path, args)?;

    if output.status.success() {
        Ok(())
    } else {
        Err(AttemptFailure::Exited(output.status))
    }
}

/// `codesign -f -s <identity> <bundle>`.
#[derive(Debug, Clone)]
pub struct Codesign {
    locator: ToolLocator,
}

impl Codesign {
    pub fn new(locator: ToolLocator) -> Self {
        Self { locator }
    }
}

impl Signer for Codesign {
    fn name(&self) -> &str {
        "codesign"
    }

    fn attempt(&self, bundle: &Path, identity: Option<&str>) -> std::result::Result<(), AttemptFailure> {
        let identity = identity.unwrap_or(AD_HOC_IDENTITY);
        let args = [
            OsStr::new("-f"),
            OsStr::new("-s"),
            OsStr::new(identity),
            bundle.as_os_str(),
        ];
        run_tool(&self.locator, "codesign", &args)
    }
}

/// `ldid -S <bundle>`.
///
/// `ldid` always signs ad-hoc, so the identity is ignored.
#[derive(Debug, Clone)]
pub struct Ldid {
    locator: ToolLocator,
}

impl Ldid {
    pub fn new(locator: ToolLocator) -> Self {
        Self { locator }
    }
}

impl Signer for Ldid {
    fn name(&self) -> &str {
        "ldid"
    }

    fn attempt(&self, bundle: &Path, _identity: Option<&str>) -> std::result::Result<(), AttemptFailure> {
        run_tool(&self.locator, "ldid", &[OsStr::new("-S"), bundle.as_os_str()])
    }
}

/// Ordered list of signers, tried until one succeeds.
pub struct SignerChain {
    signers: Vec<Box<dyn Signer>>,
}

impl SignerChain {
    /// Empty chain. Signing with it always fails.
    pub fn new() -> Self {
        Self {
            signers: Vec::new(),
        }
    }

    /// `codesign`, then `ldid`.
    pub fn system(locator: ToolLocator) -> Self {
        Self::new()
            .with(Codesign::new(locator.clone()))
            .with(Ldid::new(locator))
    }

    /// Append a signer with the lowest priority so far.
    pub fn with(mut self, signer: impl Signer + 'static) -> Self {
        self.signers.push(Box::new(signer));
        self
    }

    /// Names of the signers, in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.signers.iter().map(|s| s.name()).collect()
    }

    /// Sign `bundle` with the first signer that succeeds.
    ///
    /// Each signer is attempted exactly once. Returns the name of the signer
    /// that succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] listing every attempt if none succeeded.
    pub fn sign(&self, bundle: &Path, identity: Option<&str>) -> Result<String> {
        let mut failures = Vec::with_capacity(self.signers.len());

        for signer in &self.signers {
            match signer.attempt(bundle, identity) {
                Ok(()) => return Ok(signer.name().to_string()),
                Err(failure) => {
                    tracing::debug!(signer = signer.name(), %failure, "signer attempt failed");
                    failures.push(format!("{}: {}", signer.name(), failure));
                }
            }
        }

        if failures.is_empty() {
            return Err(Error::Signing("no signing tools configured".into()));
        }

        Err(Error::Signing(format!(
            "no signing tool succeeded ({})",
            failures.join("; ")
        )))
    }
}

impl Default for SignerChain {
    fn default() -> Self {
        Self::system(ToolLocator::from_env())
    }
}
