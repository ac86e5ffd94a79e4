//! Pipeline Orchestrator Module
//!
//! This module sequences the whole cleanup run: extract the input container
//! into a working area, dispatch every entry to the transform matching its
//! classification, and package the final working-area state into the output
//! archive.
//!
//! The phases are strictly ordered: extraction completes fully before any
//! transform runs, and every transform completes before the build phase
//! reads the working area back. Per-entry failures are aggregated into
//! warnings; a run with zero fatal errors always produces an output archive.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::{
    builder::{build, derive_output_path},
    error::CleanError,
    extract::{Extraction, extract},
    markup::transform_markup,
    orient::transform_image,
    types::{EntryKind, TransformOutcome},
};

/// Cleans one packaged EPUB container
///
/// Runs the full extract → transform → repackage pipeline for the container
/// at `input` and writes the result to the derived output path, which never
/// overwrites the input.
///
/// ## Parameters
/// - `input`: Path to the input container file
///
/// ## Return
/// - `Ok(PathBuf)`: The path of the newly written output archive
/// - `Err(CleanError)`: A fatal error aborted the run; the input is left
///   untouched and no output artifact remains
///
/// ## Notes
/// - Per-entry failures (corrupt entries, malformed markup, undecodable
///   images) are logged as warnings; the affected entries pass through to
///   the output in their extracted form and the run still succeeds.
/// - The working area is released on every exit path, including fatal
///   errors.
pub fn clean<P: AsRef<Path>>(input: P) -> Result<PathBuf, CleanError> {
    let input = input.as_ref();
    let Extraction { work, entries } = extract(input)?;

    for entry in &entries {
        let outcome = match EntryKind::from_path(entry) {
            EntryKind::Markup => transform_markup(&work, entry),
            EntryKind::Image => transform_image(&work, entry),
            EntryKind::Other => TransformOutcome::Unchanged,
        };

        match outcome {
            TransformOutcome::Unchanged => {}
            TransformOutcome::Modified => debug!("cleaned \"{}\"", entry),
            TransformOutcome::Failed(err) => warn!("skipping \"{}\": {}", entry, err),
        }
    }

    let output = derive_output_path(input);
    build(&work, &output)?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::{
        env, fs,
        io::{Cursor, Read, Write},
        path::{Path, PathBuf},
    };

    use image::{ImageBuffer, ImageFormat, Rgb};
    use zip::{ZipArchive, ZipWriter, write::FileOptions};

    use crate::{error::CleanError, pipeline::clean, utils::local_time};

    const CHAPTER: &str = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<html xmlns=\"http://www.w3.org/1999/xhtml\">\n",
        "<head><title>Chapter 1</title></head>\n",
        "<body>\n",
        "<p>line one\r\nline two</p>\n",
        "<p>RUBoardwatermarked textRUBoard</p>\n",
        "<div><a href=\"ch02.xhtml\">Next Chapter</a></div>\n",
        "</body>\n",
        "</html>\n",
    );

    const STYLESHEET: &[u8] = b"p { margin: 0; }\n";

    fn sample_png() -> Vec<u8> {
        let img = ImageBuffer::from_fn(8, 4, |x, y| {
            if x < 4 && y < 2 {
                Rgb([0u8, 0u8, 0u8])
            } else {
                Rgb([255u8, 255u8, 255u8])
            }
        });

        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    /// Assembles a small but complete fixture container
    fn fixture_epub(dir: &Path, corrupt_image: bool) -> PathBuf {
        let archive_path = dir.join("book.epub");
        let file = fs::File::create(&archive_path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::<()>::default();

        zip.start_file("mimetype", options).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("OEBPS/ch01.xhtml", options).unwrap();
        zip.write_all(CHAPTER.as_bytes()).unwrap();

        zip.start_file("OEBPS/style.css", options).unwrap();
        zip.write_all(STYLESHEET).unwrap();

        zip.start_file("OEBPS/images/fig01.png", options).unwrap();
        zip.write_all(&sample_png()).unwrap();

        if corrupt_image {
            zip.start_file("OEBPS/images/broken.jpg", options).unwrap();
            zip.write_all(b"definitely not a jpeg").unwrap();
        }

        zip.finish().unwrap();
        archive_path
    }

    fn read_entry(archive_path: &Path, entry: &str) -> Vec<u8> {
        let file = fs::File::open(archive_path).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        let mut payload = Vec::new();
        archive
            .by_name(entry)
            .unwrap()
            .read_to_end(&mut payload)
            .unwrap();
        payload
    }

    #[test]
    fn test_clean_produces_the_derived_output_path() {
        let dir = env::temp_dir().join(local_time());
        fs::create_dir_all(&dir).unwrap();
        let input = fixture_epub(&dir, false);

        let output = clean(&input).unwrap();
        assert_eq!(output, dir.join("book-clean.epub"));
        assert!(output.exists());
        assert!(input.exists());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_clean_transforms_markup_and_passes_others_through() {
        let dir = env::temp_dir().join(local_time());
        fs::create_dir_all(&dir).unwrap();
        let input = fixture_epub(&dir, false);

        let output = clean(&input).unwrap();

        let chapter = String::from_utf8(read_entry(&output, "OEBPS/ch01.xhtml")).unwrap();
        assert!(!chapter.contains("RUBoard"));
        assert!(!chapter.contains("Next Chapter"));
        assert!(chapter.contains("<p>line one line two</p>"));
        assert!(chapter.contains("<p>watermarked text</p>"));

        // Unclassified entries are byte-identical to the input
        assert_eq!(read_entry(&output, "mimetype"), b"application/epub+zip");
        assert_eq!(read_entry(&output, "OEBPS/style.css"), STYLESHEET);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_clean_rotates_images_exactly_once() {
        let dir = env::temp_dir().join(local_time());
        fs::create_dir_all(&dir).unwrap();
        let input = fixture_epub(&dir, false);

        let output = clean(&input).unwrap();

        let rotated = read_entry(&output, "OEBPS/images/fig01.png");
        let restored = image::load_from_memory(&rotated).unwrap().rotate180();
        let source = image::load_from_memory(&sample_png()).unwrap();
        assert_eq!(restored.to_rgb8().as_raw(), source.to_rgb8().as_raw());

        fs::remove_dir_all(dir).unwrap();
    }

    /// A corrupt image entry is passed through unmodified and the run succeeds
    #[test]
    fn test_clean_passes_corrupt_image_through() {
        let dir = env::temp_dir().join(local_time());
        fs::create_dir_all(&dir).unwrap();
        let input = fixture_epub(&dir, true);

        let output = clean(&input).unwrap();
        assert_eq!(
            read_entry(&output, "OEBPS/images/broken.jpg"),
            b"definitely not a jpeg"
        );

        fs::remove_dir_all(dir).unwrap();
    }

    /// A non-archive input aborts with an open error and produces no output
    #[test]
    fn test_clean_rejects_non_archive_input() {
        let dir = env::temp_dir().join(local_time());
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("bogus.epub");
        fs::write(&input, b"plain text, not a container").unwrap();

        let result = clean(&input);
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            CleanError::ArchiveOpenError { .. }
        ));
        assert!(!dir.join("bogus-clean.epub").exists());

        fs::remove_dir_all(dir).unwrap();
    }

    /// Running the pipeline on its own output yields identical markup
    #[test]
    fn test_clean_is_idempotent_on_markup() {
        let dir = env::temp_dir().join(local_time());
        fs::create_dir_all(&dir).unwrap();
        let input = fixture_epub(&dir, false);

        let first = clean(&input).unwrap();
        let second = clean(&first).unwrap();
        assert_eq!(second, dir.join("book-clean-clean.epub"));

        assert_eq!(
            read_entry(&first, "OEBPS/ch01.xhtml"),
            read_entry(&second, "OEBPS/ch01.xhtml")
        );

        fs::remove_dir_all(dir).unwrap();
    }
}
