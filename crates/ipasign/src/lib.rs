pub mod descriptor;
pub mod error;
pub mod ipa;
pub mod lint;
pub mod pipeline;
pub mod scratch;
pub mod signer;
pub mod tools;

pub use descriptor::{normalize_descriptor, DescriptorFormat, Normalization};
pub use error::Error;
pub use ipa::{create_ipa, derive_output_path, extract_ipa, validate_ipa, CompressionLevel};
pub use lint::LintOutcome;
pub use pipeline::{Resigner, RunReport, Stage};
pub use scratch::ScratchDir;
pub use signer::{Signer, SignerChain};
pub use tools::ToolLocator;

pub type Result<T> = std::result::Result<T, Error>;
