//! Archive Builder Module
//!
//! This module packages the working area's final contents into a new
//! zip-format container at a derived output path. Every entry present in
//! the working area is written exactly once, including entries earlier
//! stages skipped, in their original form. The input archive is never
//! overwritten.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;
use zip::{ZipWriter, result::ZipError, write::FileOptions};

use crate::{error::CleanError, workarea::WorkArea};

/// The marker appended to the input's name when deriving the output path
const OUTPUT_SUFFIX: &str = "-clean";

/// Derives the output archive path from the input path
///
/// The input's final extension is stripped, the suffix marker is appended,
/// and the original extension is re-appended: `book.epub` becomes
/// `book-clean.epub`. An input without an extension simply gets the suffix
/// appended.
pub fn derive_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();

    match input.extension() {
        Some(extension) => {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            input.with_file_name(format!(
                "{}{}.{}",
                stem,
                OUTPUT_SUFFIX,
                extension.to_string_lossy()
            ))
        }
        None => {
            let name = input.file_name().unwrap_or_default().to_string_lossy();
            input.with_file_name(format!("{}{}", name, OUTPUT_SUFFIX))
        }
    }
}

/// Packages the working area into a new archive at `output`
///
/// Iterates every file and directory currently present in the working area
/// and writes each as one archive entry at its original relative path,
/// using the default compression level.
///
/// ## Parameters
/// - `work`: The working area holding the (possibly mutated) entries
/// - `output`: The output archive path
///
/// ## Return
/// - `Ok(())`: The archive was fully written
/// - `Err(CleanError)`: The output could not be created or written
///   ([CleanError::ArchiveWriteError], fatal). A partially written output
///   file is removed before the error is returned.
pub fn build(work: &WorkArea, output: &Path) -> Result<(), CleanError> {
    let write_error = |source: ZipError| CleanError::ArchiveWriteError {
        path: output.display().to_string(),
        source,
    };

    let file = File::create(output).map_err(|err| write_error(ZipError::from(err)))?;

    match write_entries(work, file) {
        Ok(()) => Ok(()),
        Err(source) => {
            // No half-written artifact may be left behind
            let _ = fs::remove_file(output);
            Err(write_error(source))
        }
    }
}

/// Writes every working-area entry into the archive
fn write_entries(work: &WorkArea, file: File) -> Result<(), ZipError> {
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::<()>::default();

    for entry in WalkDir::new(work.root()) {
        let entry = entry.map_err(|err| ZipError::from(io::Error::from(err)))?;
        let path = entry.path();

        let Ok(relative) = path.strip_prefix(work.root()) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = relative.to_string_lossy().replace("\\", "/");

        if path.is_file() {
            zip.start_file(target, options)?;
            let payload = fs::read(path)?;
            zip.write_all(&payload)?;
        } else if path.is_dir() {
            zip.add_directory(target, options)?;
        }
    }

    zip.finish()?;
    Ok(())
}
