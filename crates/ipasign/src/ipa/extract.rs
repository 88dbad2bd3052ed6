//! IPA extraction functionality.
//!
//! Extracts IPA archives into a scratch directory and locates the .app bundle.

use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// Directory inside an IPA that holds the app bundle.
pub const PAYLOAD_DIR: &str = "Payload";

/// Directory-name suffix identifying an app bundle.
pub const BUNDLE_SUFFIX: &str = ".app";

/// Extract an IPA file to a destination directory.
///
/// IPA files are ZIP archives containing a Payload/ directory with the .app bundle.
/// This function extracts all contents and returns the path to the .app bundle.
///
/// # Arguments
///
/// * `ipa_path` - Path to the IPA file
/// * `dest_dir` - Destination directory for extraction
///
/// # Returns
///
/// Returns the path to the extracted .app bundle inside Payload/.
///
/// # Errors
///
/// Returns [`Error::Extraction`] if:
/// - The IPA file cannot be opened or read
/// - The IPA is not a valid ZIP archive
/// - Writing an entry to `dest_dir` fails
///
/// Returns [`Error::BundleNotFound`] if no .app bundle is found in Payload/.
pub fn extract_ipa(ipa_path: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let ipa_path = ipa_path.as_ref();
    let dest_dir = dest_dir.as_ref();

    let file = File::open(ipa_path).map_err(|e| {
        Error::Extraction(format!("cannot open {}: {}", ipa_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        Error::Extraction(format!("{} is not a valid archive: {}", ipa_path.display(), e))
    })?;

    fs::create_dir_all(dest_dir)
        .map_err(|e| Error::Extraction(format!("cannot create {}: {}", dest_dir.display(), e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Extraction(format!("cannot read entry #{}: {}", i, e)))?;

        let relative = match entry.enclosed_name() {
            Some(path) => path,
            None => {
                tracing::warn!(entry = entry.name(), "skipping entry with unsafe path");
                continue;
            }
        };
        let outpath = dest_dir.join(&relative);

        if let Some(link) = symlinked_ancestor(dest_dir, &relative) {
            return Err(Error::Extraction(format!(
                "refusing to extract {} through symlink {}",
                outpath.display(),
                link.display()
            )));
        }

        let is_dir = entry.is_dir();
        let unix_mode = entry.unix_mode();

        write_entry(&mut entry, is_dir, unix_mode, &relative, &outpath).map_err(|e| {
            Error::Extraction(format!("cannot extract {}: {}", outpath.display(), e))
        })?;
    }

    find_app_bundle(dest_dir)
}

/// Write a single archive entry to `outpath`.
///
/// Directories are created, symlinks are recreated on Unix, and regular files
/// keep their Unix permission bits. `relative` is the entry's path inside the
/// archive and decides whether a symlink target is acceptable.
fn write_entry(
    entry: &mut impl Read,
    is_dir: bool,
    unix_mode: Option<u32>,
    relative: &Path,
    outpath: &Path,
) -> io::Result<()> {
    if is_dir {
        return fs::create_dir_all(outpath);
    }

    if let Some(parent) = outpath.parent() {
        fs::create_dir_all(parent)?;
    }

    if is_symlink(outpath) {
        fs::remove_file(outpath)?;
    }

    #[cfg(unix)]
    {
        let entry_is_symlink = unix_mode
            .map(|mode| (mode & 0o170000) == 0o120000)
            .unwrap_or(false);

        if entry_is_symlink {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;

            if !symlink_target_is_contained(relative, Path::new(&target)) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("symlink target {target:?} points outside its bundle"),
                ));
            }

            return std::os::unix::fs::symlink(&target, outpath);
        }
    }

    let mut outfile = File::create(outpath)?;
    io::copy(entry, &mut outfile)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = unix_mode {
            fs::set_permissions(outpath, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }

    Ok(())
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

/// First already-extracted ancestor of `relative` that is a symlink.
fn symlinked_ancestor(dest_dir: &Path, relative: &Path) -> Option<PathBuf> {
    relative
        .ancestors()
        .skip(1)
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .map(|ancestor| dest_dir.join(ancestor))
        .find(|path| is_symlink(path))
}

/// Check that a symlink at `link` (relative to the extraction root) stays
/// inside its containing bundle.
///
/// Links under `Payload/<Name>.app/` are confined to that bundle, links one
/// level up to `Payload/`. The target must be relative, and any `..`
/// components must come first so that they only climb real directories.
fn symlink_target_is_contained(link: &Path, target: &Path) -> bool {
    let parent_depth = link.components().count().saturating_sub(1);
    let max_climb = parent_depth - parent_depth.min(2);

    let mut climb = 0;
    let mut descending = false;
    for component in target.components() {
        match component {
            Component::ParentDir if descending => return false,
            Component::ParentDir => {
                climb += 1;
                if climb > max_climb {
                    return false;
                }
            }
            Component::CurDir => {}
            Component::Normal(_) => descending = true,
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

/// Find the .app bundle inside a Payload/ directory.
///
/// When several directories match, the one whose name sorts first wins, so
/// the choice does not depend on directory iteration order. Symlinks are not
/// followed, neither for `Payload/` nor for the bundle itself.
pub fn find_app_bundle(dest_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let payload_dir = dest_dir.as_ref().join(PAYLOAD_DIR);

    let payload_is_dir = fs::symlink_metadata(&payload_dir)
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !payload_is_dir {
        return Err(Error::BundleNotFound(payload_dir));
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(&payload_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| is_bundle_name(path))
        .collect();

    candidates.sort();

    if candidates.len() > 1 {
        tracing::warn!(
            count = candidates.len(),
            "multiple .app bundles in Payload/, using the first"
        );
    }

    candidates
        .into_iter()
        .next()
        .ok_or(Error::BundleNotFound(payload_dir))
}

fn is_bundle_name(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(BUNDLE_SUFFIX))
        .unwrap_or(false)
}

/// Validate that a path is a valid IPA file.
///
/// Checks that the file exists and has a ZIP signature.
///
/// A missing file is reported as [`Error::Io`] with `NotFound`. A file that
/// exists but cannot be opened or read, or that lacks the signature, is
/// [`Error::Extraction`].
pub fn validate_ipa(ipa_path: impl AsRef<Path>) -> Result<()> {
    let ipa_path = ipa_path.as_ref();

    if !ipa_path.exists() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("IPA file not found: {}", ipa_path.display()),
        )));
    }

    let mut file = File::open(ipa_path).map_err(|e| {
        Error::Extraction(format!("cannot open {}: {}", ipa_path.display(), e))
    })?;
    let mut magic = [0u8; 2];
    if file.read_exact(&mut magic).is_err() || &magic != b"PK" {
        return Err(Error::Extraction(format!(
            "{} is not a valid ZIP/IPA file",
            ipa_path.display()
        )));
    }

    Ok(())
}
