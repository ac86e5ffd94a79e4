//! Command line entry point
//!
//! One command, one required positional argument: the path to the input
//! EPUB container. Warnings and fatal diagnostics go to the error stream;
//! the single success line naming the output path goes to the standard
//! stream. The process exits 0 on success, even if individual entries were
//! skipped with warnings, and 1 on a wrong argument count or a fatal error.

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, error::ErrorKind};

/// Cleans a packaged EPUB eBook file
///
/// Strips watermark text, prunes Next/Prev navigation links, reflows
/// paragraph text and corrects image orientation, then writes the result
/// to `<input>-clean.<ext>` without touching the input.
#[derive(Parser)]
#[command(name = "epub-clean", version)]
struct Cli {
    /// Path to the input EPUB file
    input: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Usage errors exit 1, not clap's default 2
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match epub_clean::clean(&cli.input) {
        Ok(output) => {
            println!("Cleaned EPUB saved as {}", output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
