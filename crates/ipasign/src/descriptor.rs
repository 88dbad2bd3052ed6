//! `Info.plist` normalization.
//!
//! Some tooling rejects bundles whose `Info.plist` is stored as a binary
//! property list. The normalizer sniffs the file header and rewrites binary
//! plists as XML in place. XML plists are left untouched and anything else is
//! passed through with a warning.

use crate::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Name of the descriptor file inside a bundle.
pub const INFO_PLIST: &str = "Info.plist";

const BINARY_MAGIC: &[u8] = b"bplist";
const XML_MAGIC: &[u8] = b"<?xml";
const HEADER_LEN: usize = 6;

/// On-disk encoding of a property list, as told by its first bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// Starts with `bplist`.
    Binary,
    /// Starts with `<?xml`.
    Xml,
    /// Anything else; carries the bytes that were read.
    Unknown(Vec<u8>),
}

/// What [`normalize_descriptor`] did to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// Binary plist rewritten as XML.
    Converted,
    /// Already XML, left byte-identical.
    AlreadyXml,
    /// Unrecognized header, left untouched.
    Unrecognized(Vec<u8>),
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::Converted => f.write_str("converted binary plist to XML"),
            Normalization::AlreadyXml => f.write_str("already XML"),
            Normalization::Unrecognized(header) => {
                write!(f, "unknown format {:?}", String::from_utf8_lossy(header))
            }
        }
    }
}

/// Path of the descriptor inside `bundle`.
pub fn descriptor_path(bundle: impl AsRef<Path>) -> PathBuf {
    bundle.as_ref().join(INFO_PLIST)
}

/// Classify a plist file by its header.
///
/// Files shorter than the header are classified from whatever could be read.
pub fn sniff_format(path: impl AsRef<Path>) -> Result<DescriptorFormat> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| Error::Descriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    file.take(HEADER_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| Error::Descriptor {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(classify(header))
}

fn classify(header: Vec<u8>) -> DescriptorFormat {
    if header.starts_with(BINARY_MAGIC) {
        DescriptorFormat::Binary
    } else if header.starts_with(XML_MAGIC) {
        DescriptorFormat::Xml
    } else {
        DescriptorFormat::Unknown(header)
    }
}

/// Normalize the `Info.plist` of `bundle` to XML.
///
/// # Errors
///
/// Returns [`Error::Descriptor`] if the file is missing, or if it claims to be
/// a binary plist but cannot be decoded or rewritten.
pub fn normalize_descriptor(bundle: impl AsRef<Path>) -> Result<Normalization> {
    let path = descriptor_path(bundle);

    match sniff_format(&path)? {
        DescriptorFormat::Binary => {
            tracing::info!(path = %path.display(), "binary plist detected, converting to XML");
            convert_to_xml(&path)?;
            Ok(Normalization::Converted)
        }
        DescriptorFormat::Xml => {
            tracing::info!(path = %path.display(), "XML plist detected");
            Ok(Normalization::AlreadyXml)
        }
        DescriptorFormat::Unknown(header) => {
            tracing::warn!(
                path = %path.display(),
                header = ?String::from_utf8_lossy(&header),
                "unknown plist format, leaving as-is"
            );
            Ok(Normalization::Unrecognized(header))
        }
    }
}

fn convert_to_xml(path: &Path) -> Result<()> {
    let descriptor_error = |e: plist::Error| Error::Descriptor {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    // Decode fully before truncating the file
    let value = plist::Value::from_file(path).map_err(descriptor_error)?;
    value.to_file_xml(path).map_err(descriptor_error)?;

    Ok(())
}
