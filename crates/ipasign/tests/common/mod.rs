//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use plist::{Dictionary, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Content of the `Info.plist` used by the fixtures.
pub fn sample_info() -> Value {
    let mut dict = Dictionary::new();
    dict.insert("CFBundleIdentifier".into(), Value::String("com.example.foo".into()));
    dict.insert("CFBundleExecutable".into(), Value::String("Foo".into()));
    dict.insert("CFBundleName".into(), Value::String("Foo".into()));
    dict.insert("CFBundleShortVersionString".into(), Value::String("1.2.3".into()));
    dict.insert("MinimumOSVersion".into(), Value::String("14.0".into()));
    dict.insert("UIRequiresFullScreen".into(), Value::Boolean(false));
    Value::Dictionary(dict)
}

/// `sample_info()` encoded as a binary plist.
pub fn binary_info() -> Vec<u8> {
    let mut buf = Vec::new();
    plist::to_writer_binary(&mut buf, &sample_info()).unwrap();
    buf
}

/// Write an IPA at `dir/name` with `Payload/Foo.app/Info.plist` set to `info`.
pub fn write_ipa(dir: &Path, name: &str, info: &[u8]) -> PathBuf {
    let ipa_path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&ipa_path).unwrap());
    let options = SimpleFileOptions::default();

    zip.add_directory("Payload/", options).unwrap();
    zip.add_directory("Payload/Foo.app/", options).unwrap();

    zip.start_file("Payload/Foo.app/Info.plist", options).unwrap();
    zip.write_all(info).unwrap();

    zip.start_file("Payload/Foo.app/Foo", options.unix_permissions(0o755))
        .unwrap();
    zip.write_all(b"MACHO_PLACEHOLDER").unwrap();

    zip.add_directory("Payload/Foo.app/Base.lproj/", options).unwrap();
    zip.start_file("Payload/Foo.app/Base.lproj/Main.storyboardc", options)
        .unwrap();
    zip.write_all(b"STORYBOARD").unwrap();

    zip.finish().unwrap();
    ipa_path
}

/// Write an IPA whose Payload/ holds no `.app` directory.
pub fn write_ipa_without_bundle(dir: &Path, name: &str) -> PathBuf {
    let ipa_path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&ipa_path).unwrap());
    let options = SimpleFileOptions::default();

    zip.add_directory("Payload/", options).unwrap();
    zip.start_file("Payload/README.txt", options).unwrap();
    zip.write_all(b"nothing to see").unwrap();

    zip.finish().unwrap();
    ipa_path
}

/// Write an IPA holding a symlink `link -> target`, then a regular file at
/// each path in `files`. `Payload/` is always present.
pub fn write_ipa_with_symlink(
    dir: &Path,
    name: &str,
    link: &str,
    target: &str,
    files: &[&str],
) -> PathBuf {
    let ipa_path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&ipa_path).unwrap());
    let options = SimpleFileOptions::default();

    zip.add_directory("Payload/", options).unwrap();
    zip.add_symlink(link, target, options).unwrap();
    for path in files {
        zip.start_file(*path, options).unwrap();
        zip.write_all(b"from the archive").unwrap();
    }

    zip.finish().unwrap();
    ipa_path
}

/// Write a `/bin/sh` stub named `name` into `dir` that records its arguments
/// in `<dir>/<name>.args` and exits with `code`.
#[cfg(unix)]
pub fn write_stub_tool(dir: &Path, name: &str, code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let log = dir.join(format!("{name}.args"));
    fs::write(
        &path,
        format!("#!/bin/sh\necho \"$@\" > '{}'\nexit {code}\n", log.display()),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Arguments recorded by a stub from [`write_stub_tool`], if it ran.
pub fn recorded_args(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(format!("{name}.args")))
        .ok()
        .map(|s| s.trim_end().to_string())
}

/// Number of entries left in a directory.
pub fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}
