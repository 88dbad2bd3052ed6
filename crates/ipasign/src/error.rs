//! Error types for ipasign operations.
//!
//! This module defines the [`enum@Error`] enum covering every terminal failure
//! of a re-signing run: reading the input archive, locating the app bundle,
//! decoding `Info.plist`, invoking the signing tools and writing the output.
//!
//! Failures that never abort a run (a missing `plutil`, a signer that is not
//! installed while another one is) have their own local types in
//! [`crate::lint`] and [`crate::signer`].
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use std::path::PathBuf;
use thiserror::Error;

/// Error type for ipasign operations.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// Every variant is terminal for the run that produced it.
///
/// # Examples
///
/// ```no_run
/// use ipasign::{Error, Resigner};
///
/// match Resigner::new().run("input.ipa") {
///     Ok(report) => println!("Signed IPA: {}", report.output.display()),
///     Err(Error::BundleNotFound(payload)) => eprintln!("No .app in {}", payload.display()),
///     Err(Error::Signing(msg)) => eprintln!("Signing failed: {msg}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed outside of a specific stage.
    ///
    /// Occurs when the scratch directory cannot be created or the input
    /// archive does not exist.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input archive is malformed or unreadable.
    ///
    /// Raised by [`crate::ipa::extract_ipa`] and [`crate::ipa::validate_ipa`].
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// No `.app` directory was found under `Payload/`.
    ///
    /// Carries the `Payload/` directory that was scanned.
    #[error("No .app bundle found in {}", .0.display())]
    BundleNotFound(PathBuf),

    /// The bundle's `Info.plist` is missing or could not be decoded.
    #[error("Invalid descriptor {}: {message}", .path.display())]
    Descriptor {
        /// Path of the descriptor that failed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Every configured signing tool was absent or failed.
    ///
    /// The message summarises each attempt in order.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Writing the output archive failed.
    ///
    /// Raised by [`crate::ipa::create_ipa`]. A partially written output file
    /// is removed before this error is returned.
    #[error("Packaging failed: {0}")]
    Packaging(String),
}
