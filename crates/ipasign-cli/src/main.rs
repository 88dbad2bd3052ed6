//! Command-line interface for the ipasign IPA re-signing tool.
//!
//! Unpacks an IPA, converts a binary `Info.plist` to XML, signs the app
//! bundle with `codesign` (or `ldid` as a fallback) and repacks it.

mod logging;

use clap::Parser;
use ipasign::Resigner;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "ipasign")]
#[command(about = "Re-sign an iOS IPA with the system signing tools")]
struct Cli {
    /// Input IPA file
    ipa: PathBuf,

    /// Output IPA path (default: <input>-signed.ipa)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Signing identity passed to codesign (default: ad-hoc)
    #[arg(short, long)]
    cert: Option<String>,

    /// ZIP compression level (0-9, default: 6)
    #[arg(short = 'z', long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    zip_level: u32,

    /// Do not validate Info.plist with plutil
    #[arg(long)]
    skip_lint: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn resigner(&self) -> Resigner {
        let mut resigner = Resigner::new()
            .compression_level(self.zip_level)
            .skip_lint(self.skip_lint);

        if let Some(ref output) = self.output {
            resigner = resigner.output(output);
        }
        if let Some(ref cert) = self.cert {
            resigner = resigner.identity(cert.clone());
        }

        resigner
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init_cli_logger(cli.verbose);
    tracing::debug!(?cli, "parsed arguments");

    if !cli.ipa.exists() {
        eprintln!("File not found: {}", cli.ipa.display());
        return ExitCode::FAILURE;
    }

    match cli.resigner().run(&cli.ipa) {
        Ok(report) => {
            println!("Signed IPA: {}", report.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ipasign", "App.ipa"]).unwrap();

        assert_eq!(cli.ipa, PathBuf::from("App.ipa"));
        assert!(cli.output.is_none());
        assert!(cli.cert.is_none());
        assert_eq!(cli.zip_level, 6);
        assert!(!cli.skip_lint);
        assert!(!cli.verbose);
        assert_eq!(
            cli.resigner().output_path_for(&cli.ipa),
            Path::new("App-signed.ipa")
        );
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "ipasign",
            "App.ipa",
            "-o",
            "out/Resigned.ipa",
            "-c",
            "Apple Development: Jane Doe",
            "-z",
            "0",
            "--skip-lint",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.output.as_deref(), Some(Path::new("out/Resigned.ipa")));
        assert_eq!(cli.cert.as_deref(), Some("Apple Development: Jane Doe"));
        assert_eq!(cli.zip_level, 0);
        assert!(cli.skip_lint);
        assert!(cli.verbose);
        assert_eq!(
            cli.resigner().output_path_for(&cli.ipa),
            Path::new("out/Resigned.ipa")
        );
    }

    #[test]
    fn test_long_flags() {
        let cli = Cli::try_parse_from([
            "ipasign",
            "--output",
            "x.ipa",
            "--cert",
            "Dev",
            "--zip-level",
            "9",
            "App.ipa",
        ])
        .unwrap();

        assert_eq!(cli.output, Some(PathBuf::from("x.ipa")));
        assert_eq!(cli.cert.as_deref(), Some("Dev"));
        assert_eq!(cli.zip_level, 9);
    }

    #[test]
    fn test_missing_input_is_rejected() {
        assert!(Cli::try_parse_from(["ipasign"]).is_err());
    }

    #[test]
    fn test_zip_level_out_of_range() {
        assert!(Cli::try_parse_from(["ipasign", "App.ipa", "-z", "10"]).is_err());
    }
}
