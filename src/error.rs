//! Error Type Definition Module
//!
//! This module defines the various error types that may be encountered while
//! cleaning an EPUB file. All errors are uniformly wrapped in the
//! `CleanError` enumeration for convenient error handling by the caller.
//!
//! Two groups of errors exist: fatal errors that abort the whole run before
//! any output is declared (opening the input archive, writing the output
//! archive, working-area I/O), and per-entry errors that are recovered
//! locally by passing the affected entry through unmodified.

use thiserror::Error;

/// Types of errors that can occur while cleaning an EPUB file
///
/// This enumeration defines the error cases encountered when extracting,
/// transforming and repackaging an EPUB container, including archive
/// corruption, malformed markup, undecodable images, etc.
#[derive(Debug, Error)]
pub enum CleanError {
    /// Single entry extraction error
    ///
    /// One entry of the input archive could not be extracted, usually
    /// because it is corrupt or uses an unsafe path. The entry is skipped
    /// with a warning and the rest of the archive is still processed.
    #[error("Archive entry error: Unable to extract \"{entry}\": {reason}")]
    ArchiveEntryError { entry: String, reason: String },

    /// Input archive open error
    ///
    /// The input file is missing, unreadable, or is not a valid ZIP
    /// archive. This error is fatal: the run aborts before any output
    /// is produced.
    #[error("Archive open error: Unable to open \"{path}\": {source}")]
    ArchiveOpenError {
        path: String,
        source: zip::result::ZipError,
    },

    /// Output archive write error
    ///
    /// The output archive could not be created or written. This error is
    /// fatal; a partially written output file is removed before the error
    /// is reported.
    #[error("Archive write error: Unable to write \"{path}\": {source}")]
    ArchiveWriteError {
        path: String,
        source: zip::result::ZipError,
    },

    /// Data Decoding Error - Null data
    ///
    /// This error occurs when trying to decode an empty stream.
    #[error("Decode error: The data is empty.")]
    EmptyDataError,

    /// Image decoding error
    ///
    /// An image entry's payload could not be decoded into a pixel buffer,
    /// or the rotated buffer could not be re-encoded. The entry's transform
    /// is skipped with a warning and the original payload passes through.
    #[error("Image decode error: Unable to decode \"{entry}\": {source}")]
    ImageDecodeError {
        entry: String,
        source: image::ImageError,
    },

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Markup parsing error
    ///
    /// A markup entry's payload is malformed and could not be parsed into
    /// a document tree. The entry's transform is skipped with a warning and
    /// the original payload passes through.
    #[error("Markup parse error: Unable to parse \"{entry}\": {reason}")]
    MarkupParseError { entry: String, reason: String },

    /// UTF-8 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-8 string
    /// but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf8DecodeError { source: std::string::FromUtf8Error },

    /// UTF-16 decoding error
    ///
    /// This error occurs when attempting to decode byte data into a UTF-16 string
    /// but the data is not formatted correctly.
    #[error("Decode error: {source}")]
    Utf16DecodeError { source: std::string::FromUtf16Error },

    /// QuickXml error
    ///
    /// This error occurs when serializing a document tree back to bytes
    /// using the QuickXml library.
    #[error("QuickXml error: {source}")]
    QuickXmlError { source: quick_xml::Error },
}

impl From<quick_xml::Error> for CleanError {
    fn from(value: quick_xml::Error) -> Self {
        CleanError::QuickXmlError { source: value }
    }
}

impl From<std::io::Error> for CleanError {
    fn from(value: std::io::Error) -> Self {
        CleanError::IOError { source: value }
    }
}

impl From<std::string::FromUtf8Error> for CleanError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        CleanError::Utf8DecodeError { source: value }
    }
}

impl From<std::string::FromUtf16Error> for CleanError {
    fn from(value: std::string::FromUtf16Error) -> Self {
        CleanError::Utf16DecodeError { source: value }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CleanError;

    #[test]
    fn test_error_messages_name_the_kind() {
        let err = CleanError::ArchiveEntryError {
            entry: "images/cover.jpg".to_string(),
            reason: "invalid checksum".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Archive entry error: Unable to extract \"images/cover.jpg\": invalid checksum"
        );

        let err = CleanError::MarkupParseError {
            entry: "ch01.xhtml".to_string(),
            reason: "unexpected end of file".to_string(),
        };
        assert!(err.to_string().starts_with("Markup parse error:"));
    }
}
