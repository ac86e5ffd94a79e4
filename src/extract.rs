//! Archive Extractor Module
//!
//! This module opens the input container as a ZIP archive and materializes
//! every entry into the working area. Opening failures are fatal; a failure
//! on a single entry is logged and that entry is skipped, so one damaged
//! entry does not block the rest of the document.

use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use log::warn;
use zip::{ZipArchive, result::ZipError};

use crate::{error::CleanError, workarea::WorkArea};

/// The result of extracting an input container
///
/// Holds the populated working area together with the list of file-entry
/// paths, in the order returned by the archive's own directory enumeration.
/// Directory entries are materialized in the working area but not listed,
/// since they carry no payload to transform.
#[derive(Debug)]
pub struct Extraction {
    /// The working area holding every extracted payload
    pub work: WorkArea,

    /// Relative, slash-separated file-entry paths in enumeration order
    pub entries: Vec<String>,
}

/// Extracts the input container into a fresh working area
///
/// Opens the file at `input` as a ZIP archive and reads every entry's full
/// payload into the working area under its original relative path, creating
/// intermediate directories as needed.
///
/// ## Parameters
/// - `input`: Path to the input container file
///
/// ## Return
/// - `Ok(Extraction)`: The populated working area and the ordered entry list
/// - `Err(CleanError)`: The input cannot be opened or is not a valid archive
///   ([CleanError::ArchiveOpenError], fatal), or the working area cannot be
///   created
///
/// ## Notes
/// - A per-entry extraction failure (corrupt entry, unsafe path) is logged
///   as a warning and the entry is skipped; it never fails the extraction.
pub fn extract<P: AsRef<Path>>(input: P) -> Result<Extraction, CleanError> {
    let path = input.as_ref();

    let file = File::open(path).map_err(|err| CleanError::ArchiveOpenError {
        path: path.display().to_string(),
        source: ZipError::from(err),
    })?;

    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|err| CleanError::ArchiveOpenError {
            path: path.display().to_string(),
            source: err,
        })?;

    let work = WorkArea::new()?;
    let mut entries = Vec::new();

    for index in 0..archive.len() {
        match extract_entry(&mut archive, index, &work) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => continue,
            Err(err) => warn!("{}", err),
        }
    }

    Ok(Extraction { work, entries })
}

/// Extracts a single archive entry into the working area
///
/// Returns the entry's normalized relative path, or `None` for directory
/// entries, which are created in the working area but carry no payload.
fn extract_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    work: &WorkArea,
) -> Result<Option<String>, CleanError> {
    let mut file = archive
        .by_index(index)
        .map_err(|err| CleanError::ArchiveEntryError {
            entry: format!("#{}", index),
            reason: err.to_string(),
        })?;

    let raw_name = file.name().to_string();

    // Refuse entry paths that would escape the working area
    let target = match file.enclosed_name() {
        Some(path) => path,
        None => {
            return Err(CleanError::ArchiveEntryError {
                entry: raw_name,
                reason: "entry path escapes the archive root".to_string(),
            });
        }
    };
    let entry = target.to_string_lossy().replace("\\", "/");

    if file.is_dir() {
        work.create_dir(&target)?;
        return Ok(None);
    }

    let mut payload = Vec::new();
    file.read_to_end(&mut payload)
        .map_err(|err| CleanError::ArchiveEntryError {
            entry: entry.clone(),
            reason: err.to_string(),
        })?;

    work.write(&target, &payload)
        .map_err(|err| CleanError::ArchiveEntryError {
            entry: entry.clone(),
            reason: err.to_string(),
        })?;

    Ok(Some(entry))
}
