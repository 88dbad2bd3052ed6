//! IPA archive creation.
//!
//! Creates IPA (ZIP) archives from `.app` bundles with the standard `Payload/` structure.
//!
//! For the reverse operation, see the [`extract`](super::extract) module.
//!
//! # Features
//!
//! - Configurable compression via [`CompressionLevel`]
//! - Preserves Unix file permissions and symlinks
//! - Removes a partially written archive when packaging fails
//!
//! # Examples
//!
//! ```no_run
//! use ipasign::ipa::{create_ipa, CompressionLevel};
//! use std::path::Path;
//!
//! let app_bundle = Path::new("Payload/MyApp.app");
//! create_ipa(app_bundle, "output.ipa", CompressionLevel::DEFAULT)?;
//! # Ok::<(), ipasign::Error>(())
//! ```

use super::extract::PAYLOAD_DIR;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// ZIP compression level for IPA creation.
///
/// Controls the trade-off between compression speed and output file size.
/// Use the provided constants for common use cases, or [`CompressionLevel::new`]
/// for custom levels.
///
/// # Examples
///
/// ```
/// use ipasign::ipa::CompressionLevel;
///
/// let fast = CompressionLevel::NONE;
/// let balanced = CompressionLevel::DEFAULT;
/// let small = CompressionLevel::MAX;
///
/// // Custom levels are clamped to 0-9
/// let custom = CompressionLevel::new(3);
/// assert_eq!(custom.level(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    /// No compression (level 0).
    ///
    /// Entries are stored as-is.
    pub const NONE: CompressionLevel = CompressionLevel(0);

    /// Default compression (level 6).
    pub const DEFAULT: CompressionLevel = CompressionLevel(6);

    /// Maximum compression (level 9).
    pub const MAX: CompressionLevel = CompressionLevel(9);

    /// Creates a compression level from 0-9.
    ///
    /// Values greater than 9 are clamped to 9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        CompressionLevel(level.min(9))
    }

    /// Returns the compression level value (0-9).
    #[must_use]
    pub fn level(&self) -> u32 {
        self.0
    }

    fn file_options(&self) -> SimpleFileOptions {
        if self.0 == 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.0)))
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for CompressionLevel {
    fn from(level: u32) -> Self {
        CompressionLevel::new(level)
    }
}

/// Creates an IPA file from a signed `.app` bundle.
///
/// Every entry of the bundle is written under `Payload/<AppName>.app/`,
/// keeping its path relative to the bundle root.
///
/// # Arguments
///
/// * `app_bundle_path` - Path to the `.app` bundle directory
/// * `output_path` - Path for the output IPA file
/// * `compression_level` - ZIP compression level (see [`CompressionLevel`])
///
/// # Errors
///
/// Returns [`Error::Packaging`] if the bundle is missing or not a directory,
/// if the output cannot be created, or if any entry cannot be read or
/// written. The partial output file is removed in the latter cases.
pub fn create_ipa(
    app_bundle_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    compression_level: CompressionLevel,
) -> Result<()> {
    let app_bundle_path = app_bundle_path.as_ref();
    let output_path = output_path.as_ref();

    if !app_bundle_path.is_dir() {
        return Err(Error::Packaging(format!(
            "app bundle is not a directory: {}",
            app_bundle_path.display()
        )));
    }

    let app_name = app_bundle_path
        .file_name()
        .ok_or_else(|| Error::Packaging("invalid app bundle path".into()))?
        .to_string_lossy()
        .into_owned();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Packaging(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }

    let file = File::create(output_path).map_err(|e| {
        Error::Packaging(format!("cannot create {}: {}", output_path.display(), e))
    })?;

    let result = write_bundle(ZipWriter::new(file), app_bundle_path, &app_name, compression_level);

    if let Err(e) = result {
        let _ = fs::remove_file(output_path);
        return Err(Error::Packaging(format!(
            "cannot write {}: {}",
            output_path.display(),
            e
        )));
    }

    Ok(())
}

fn write_bundle(
    mut zip: ZipWriter<File>,
    app_bundle_path: &Path,
    app_name: &str,
    compression_level: CompressionLevel,
) -> io::Result<()> {
    let options = compression_level.file_options();

    zip.add_directory(format!("{}/", PAYLOAD_DIR), options)?;

    // Symlinks inside frameworks must stay symlinks
    for entry in WalkDir::new(app_bundle_path).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;

        let path = entry.path();
        let relative_path = path
            .strip_prefix(app_bundle_path)
            .map_err(io::Error::other)?;

        let archive_path = if relative_path.as_os_str().is_empty() {
            format!("{}/{}/", PAYLOAD_DIR, app_name)
        } else {
            format!("{}/{}/{}", PAYLOAD_DIR, app_name, to_archive_path(relative_path))
        };

        let metadata = fs::symlink_metadata(path)?;

        if metadata.is_dir() {
            let dir_path = if archive_path.ends_with('/') {
                archive_path
            } else {
                format!("{}/", archive_path)
            };
            zip.add_directory(dir_path, options)?;
        } else if metadata.file_type().is_symlink() {
            let target = fs::read_link(path)?;
            zip.add_symlink(archive_path, target.to_string_lossy(), options)?;
        } else {
            #[cfg(unix)]
            let options = {
                use std::os::unix::fs::PermissionsExt;
                options.unix_permissions(metadata.permissions().mode())
            };

            zip.start_file(archive_path, options)?;
            let mut file = File::open(path)?;
            io::copy(&mut file, &mut zip)?;
        }
    }

    zip.finish()?;

    Ok(())
}

/// ZIP entry names always use `/`, whatever the host separator is.
fn to_archive_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
