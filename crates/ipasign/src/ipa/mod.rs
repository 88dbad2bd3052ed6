//! IPA handling module.
//!
//! Provides functionality for extracting and repacking IPA files.

pub mod archive;
pub mod extract;

pub use archive::{create_ipa, CompressionLevel};
pub use extract::{extract_ipa, find_app_bundle, validate_ipa, BUNDLE_SUFFIX, PAYLOAD_DIR};

use std::path::{Path, PathBuf};

const SIGNED_SUFFIX: &str = "-signed";

/// Derive the default output path for a signed IPA.
///
/// `dir/App.ipa` becomes `dir/App-signed.ipa`. An input without an extension
/// gets `-signed.ipa` appended to its file name.
///
/// # Examples
///
/// ```
/// use ipasign::ipa::derive_output_path;
/// use std::path::Path;
///
/// assert_eq!(
///     derive_output_path("build/App.ipa"),
///     Path::new("build/App-signed.ipa")
/// );
/// ```
pub fn derive_output_path(input: impl AsRef<Path>) -> PathBuf {
    let input = input.as_ref();

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, SIGNED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}.ipa", stem, SIGNED_SUFFIX),
    };

    input.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Create a minimal test IPA file.
    fn create_test_ipa(dir: &Path) -> PathBuf {
        let ipa_path = dir.join("test.ipa");
        let file = File::create(&ipa_path).unwrap();
        let mut zip = ZipWriter::new(file);

        let options = SimpleFileOptions::default();

        zip.add_directory("Payload/", options).unwrap();
        zip.add_directory("Payload/Test.app/", options).unwrap();

        zip.start_file("Payload/Test.app/Info.plist", options)
            .unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>com.test.app</string>
    <key>CFBundleExecutable</key>
    <string>Test</string>
</dict>
</plist>"#,
        )
        .unwrap();

        zip.start_file("Payload/Test.app/Test", options).unwrap();
        zip.write_all(b"MACHO_PLACEHOLDER").unwrap();

        zip.finish().unwrap();

        ipa_path
    }

    #[test]
    fn test_extract_and_repack_ipa() {
        let temp_dir = TempDir::new().unwrap();
        let ipa_path = create_test_ipa(temp_dir.path());

        let extract_dir = temp_dir.path().join("extracted");
        let app_bundle = extract_ipa(&ipa_path, &extract_dir).unwrap();

        let output_ipa = temp_dir.path().join("repacked.ipa");
        create_ipa(&app_bundle, &output_ipa, CompressionLevel::DEFAULT).unwrap();

        let verify_dir = temp_dir.path().join("verify");
        let verified_bundle = extract_ipa(&output_ipa, &verify_dir).unwrap();

        assert!(verified_bundle.ends_with("Payload/Test.app"));
        assert_eq!(
            fs::read(verified_bundle.join("Info.plist")).unwrap(),
            fs::read(app_bundle.join("Info.plist")).unwrap()
        );
        assert_eq!(fs::read(verified_bundle.join("Test")).unwrap(), b"MACHO_PLACEHOLDER");
    }

    #[test]
    fn test_derive_output_path() {
        assert_eq!(derive_output_path("App.ipa"), PathBuf::from("App-signed.ipa"));
        assert_eq!(
            derive_output_path("/tmp/builds/My App.ipa"),
            PathBuf::from("/tmp/builds/My App-signed.ipa")
        );
    }

    #[test]
    fn test_derive_output_path_keeps_extension_case() {
        assert_eq!(derive_output_path("App.IPA"), PathBuf::from("App-signed.IPA"));
    }

    #[test]
    fn test_derive_output_path_only_touches_file_name() {
        assert_eq!(
            derive_output_path("releases.ipa/App.ipa"),
            PathBuf::from("releases.ipa/App-signed.ipa")
        );
    }

    #[test]
    fn test_derive_output_path_without_extension() {
        assert_eq!(derive_output_path("dist/App"), PathBuf::from("dist/App-signed.ipa"));
    }
}
