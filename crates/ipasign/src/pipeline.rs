//! Resigner builder API
//!
//! Drives one re-signing run: extract the IPA into a scratch directory,
//! normalize `Info.plist`, sign the bundle with a system tool and pack it
//! back into an IPA.

use crate::descriptor::{self, Normalization};
use crate::ipa::{self, CompressionLevel};
use crate::lint::{LintOutcome, Linter};
use crate::scratch::ScratchDir;
use crate::signer::SignerChain;
use crate::tools::ToolLocator;
use crate::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// Progress of a run. Stages only ever advance; a failure ends the run in
/// [`Stage::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Extracted,
    Normalized,
    Signed,
    Packaged,
    Done,
    Failed,
}

impl Stage {
    /// The stage a successful step from `self` reaches.
    ///
    /// A failure is reported against this stage: a run that stopped at
    /// [`Stage::Normalized`] failed while signing. `Done` and `Failed` are
    /// terminal and return themselves.
    pub fn next(self) -> Stage {
        match self {
            Stage::Start => Stage::Extracted,
            Stage::Extracted => Stage::Normalized,
            Stage::Normalized => Stage::Signed,
            Stage::Signed => Stage::Packaged,
            Stage::Packaged => Stage::Done,
            Stage::Done => Stage::Done,
            Stage::Failed => Stage::Failed,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Start => "start",
            Stage::Extracted => "extracted",
            Stage::Normalized => "normalized",
            Stage::Signed => "signed",
            Stage::Packaged => "packaged",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Path of the signed IPA.
    pub output: PathBuf,
    /// Directory name of the app bundle, e.g. `MyApp.app`.
    pub bundle_name: String,
    /// What happened to `Info.plist`.
    pub descriptor: Normalization,
    /// Result of `plutil -lint`.
    pub lint: LintOutcome,
    /// Name of the signing tool that succeeded.
    pub signer: String,
}

/// IPA re-signing tool with builder pattern API.
///
/// # Example
///
/// ```no_run
/// use ipasign::Resigner;
///
/// let report = Resigner::new()
///     .identity("Apple Development: Jane Doe (ABCDE12345)")
///     .output("MyApp-resigned.ipa")
///     .run("MyApp.ipa")?;
/// println!("signed with {}", report.signer);
/// # Ok::<(), ipasign::Error>(())
/// ```
pub struct Resigner {
    output: Option<PathBuf>,
    identity: Option<String>,
    compression_level: CompressionLevel,
    skip_lint: bool,
    scratch_root: Option<PathBuf>,
    locator: ToolLocator,
    signers: Option<SignerChain>,
}

impl Resigner {
    /// Create a new Resigner builder.
    ///
    /// Defaults: derived output path, ad-hoc identity, compression level 6,
    /// linting on, scratch space in the OS temp directory, tools from `PATH`.
    pub fn new() -> Self {
        Self {
            output: None,
            identity: None,
            compression_level: CompressionLevel::DEFAULT,
            skip_lint: false,
            scratch_root: None,
            locator: ToolLocator::from_env(),
            signers: None,
        }
    }

    /// Set the output IPA path.
    ///
    /// Without it the output is written next to the input as `<name>-signed.ipa`.
    pub fn output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the signing identity passed to `codesign`.
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set ZIP compression level for the output (0-9).
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = CompressionLevel::new(level);
        self
    }

    /// Do not run `plutil -lint` on the normalized descriptor.
    pub fn skip_lint(mut self, skip: bool) -> Self {
        self.skip_lint = skip;
        self
    }

    /// Create the scratch directory under `root` instead of the OS temp directory.
    pub fn scratch_root(mut self, root: impl AsRef<Path>) -> Self {
        self.scratch_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Resolve external tools with `locator` instead of the process `PATH`.
    pub fn locator(mut self, locator: ToolLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Replace the default `codesign`, `ldid` chain.
    pub fn signers(mut self, signers: SignerChain) -> Self {
        self.signers = Some(signers);
        self
    }

    /// Output path for `input` under the current configuration.
    pub fn output_path_for(&self, input: impl AsRef<Path>) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| ipa::derive_output_path(input))
    }

    /// Re-sign `input`.
    ///
    /// The scratch directory is removed before this returns, whether the run
    /// succeeded or not.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that failed; see [`crate::Error`].
    /// The failing stage is logged at error level.
    pub fn run(&self, input: impl AsRef<Path>) -> Result<RunReport> {
        let mut stage = Stage::Start;
        let result = self.run_tracked(input.as_ref(), &mut stage);

        if let Err(e) = &result {
            tracing::error!(stage = %stage.next(), reached = %stage, error = %e, "stage failed");
            advance(&mut stage, Stage::Failed);
        }

        result
    }

    /// Run every stage, leaving the last stage reached in `stage`.
    fn run_tracked(&self, input: &Path, stage: &mut Stage) -> Result<RunReport> {
        let output = self.output_path_for(input);

        ipa::validate_ipa(input)?;

        let scratch = match &self.scratch_root {
            Some(root) => ScratchDir::new_in(root)?,
            None => ScratchDir::new()?,
        };
        tracing::debug!(scratch = %scratch.path().display(), "created scratch directory");

        let result = self.run_stages(input, &output, &scratch, stage);

        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "failed to remove scratch directory");
        }

        result
    }

    fn run_stages(
        &self,
        input: &Path,
        output: &Path,
        scratch: &ScratchDir,
        stage: &mut Stage,
    ) -> Result<RunReport> {
        tracing::info!(input = %input.display(), "extracting");
        let bundle = ipa::extract_ipa(input, scratch.path())?;
        let bundle_name = bundle
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        advance(stage, Stage::Extracted);
        tracing::info!(bundle = %bundle_name, "found app bundle");

        tracing::info!("checking Info.plist");
        let normalization = descriptor::normalize_descriptor(&bundle)?;
        let lint = self.lint_descriptor(&bundle);
        advance(stage, Stage::Normalized);

        tracing::info!(bundle = %bundle_name, "signing");
        let signer = match &self.signers {
            Some(chain) => chain.sign(&bundle, self.identity.as_deref())?,
            None => SignerChain::system(self.locator.clone())
                .sign(&bundle, self.identity.as_deref())?,
        };
        tracing::info!(signer = %signer, "signed");
        advance(stage, Stage::Signed);

        tracing::info!(output = %output.display(), "packaging");
        ipa::create_ipa(&bundle, output, self.compression_level)?;
        advance(stage, Stage::Packaged);

        tracing::info!(output = %output.display(), "IPA created");
        advance(stage, Stage::Done);

        Ok(RunReport {
            output: output.to_path_buf(),
            bundle_name,
            descriptor: normalization,
            lint,
            signer,
        })
    }

    /// Lint failures are reported and swallowed.
    fn lint_descriptor(&self, bundle: &Path) -> LintOutcome {
        if self.skip_lint {
            return LintOutcome::Skipped;
        }

        let result = Linter::new(self.locator.clone()).lint(&descriptor::descriptor_path(bundle));
        match &result {
            Ok(()) => tracing::info!("plist validation passed"),
            Err(e) => tracing::warn!(error = %e, "plist validation unavailable or failed"),
        }
        LintOutcome::from(&result)
    }
}

impl Default for Resigner {
    fn default() -> Self {
        Self::new()
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
}
