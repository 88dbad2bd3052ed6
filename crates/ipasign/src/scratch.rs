//! Scratch directory owned by a single run.
//!
//! The directory and everything extracted into it is removed when the
//! [`ScratchDir`] is dropped, so every exit path of a run cleans up, `?`
//! propagation included.

use crate::Result;
use std::path::Path;
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = "ipasign-";

/// Exclusively owned working directory for one run.
#[derive(Debug)]
pub struct ScratchDir {
    inner: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory in the OS temporary directory.
    pub fn new() -> Result<Self> {
        let inner = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        Ok(Self { inner })
    }

    /// Create a scratch directory under `root`.
    ///
    /// `root` must already exist.
    pub fn new_in(root: impl AsRef<Path>) -> Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(root)?;
        Ok(Self { inner })
    }

    /// Path of the scratch directory.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Remove the directory now, reporting any error.
    ///
    /// Dropping the handle also removes it but ignores failures.
    pub fn close(self) -> Result<()> {
        self.inner.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scratch_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(root.path()).unwrap();
        let path = scratch.path().to_path_buf();

        fs::create_dir_all(path.join("Payload/Test.app")).unwrap();
        fs::write(path.join("Payload/Test.app/Info.plist"), b"<plist/>").unwrap();
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_close() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(root.path()).unwrap();
        let path = scratch.path().to_path_buf();

        scratch.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_prefix() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(root.path()).unwrap();
        let name = scratch.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("ipasign-"));
    }

    #[test]
    fn test_scratch_missing_root() {
        let root = TempDir::new().unwrap();
        let result = ScratchDir::new_in(root.path().join("missing"));
        assert!(result.is_err());
    }
}
