//! Image Orientation Corrector Module
//!
//! This module decodes raster image entries (JPEG and PNG), applies a fixed
//! 180-degree rotation, and re-encodes the rotated pixel buffer in the same
//! format as the source.
//!
//! The rotation is applied unconditionally to every decodable image; no
//! embedded orientation metadata is inspected. Entries that cannot be
//! decoded are reported as failed and their payload passes through
//! unmodified.

use std::io::Cursor;

use crate::{error::CleanError, types::TransformOutcome, workarea::WorkArea};

/// Rotates an encoded image by 180 degrees
///
/// The payload's format is sniffed from its content, decoded into a pixel
/// buffer, rotated, and re-encoded into the same format.
///
/// ## Parameters
/// - `entry`: The entry path, used for error context only
/// - `payload`: The encoded source image bytes
///
/// ## Return
/// - `Ok(Vec<u8>)`: The re-encoded, rotated image
/// - `Err(CleanError)`: The payload could not be decoded or re-encoded
///   ([CleanError::ImageDecodeError])
pub fn correct_orientation(entry: &str, payload: &[u8]) -> Result<Vec<u8>, CleanError> {
    let decode_error = |source: image::ImageError| CleanError::ImageDecodeError {
        entry: entry.to_string(),
        source,
    };

    let format = image::guess_format(payload).map_err(decode_error)?;
    let decoded = image::load_from_memory_with_format(payload, format).map_err(decode_error)?;

    let rotated = decoded.rotate180();

    let mut buffer = Vec::new();
    rotated
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(decode_error)?;

    Ok(buffer)
}

/// Applies the orientation correction to one working-area entry
///
/// Decodable entries are overwritten with the rotated payload; entries that
/// fail to decode keep their extracted bytes and are reported as failed.
pub fn transform_image(work: &WorkArea, entry: &str) -> TransformOutcome {
    let payload = match work.read(entry) {
        Ok(payload) => payload,
        Err(err) => return TransformOutcome::Failed(err),
    };

    let rotated = match correct_orientation(entry, &payload) {
        Ok(rotated) => rotated,
        Err(err) => return TransformOutcome::Failed(err),
    };

    match work.write(entry, &rotated) {
        Ok(()) => TransformOutcome::Modified,
        Err(err) => TransformOutcome::Failed(err),
    }
}
