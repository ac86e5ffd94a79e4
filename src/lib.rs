//! Epub clean
//!
//! A Rust library and command line tool for batch cleanup of EPUB eBook files.
//!
//! This library runs a sequential extract → transform → repackage pipeline
//! over one EPUB container per invocation. The container's entries are
//! materialized into a scoped working area, chapter markup is cleaned and
//! raster images are re-oriented in place, and the final state is packaged
//! into a new container next to the input.
//!
//! ## Features
//!
//! - Strip a fixed watermark substring from chapter body text.
//! - Prune "Next"/"Prev" navigation anchors from chapter markup.
//! - Reflow paragraph text by collapsing embedded line breaks.
//! - Rotate embedded JPEG and PNG images by 180 degrees.
//! - Pass every other resource through byte-identical.
//!
//! ## Quick Start
//!
//! ```rust, no_run
//! # fn main() -> Result<(), epub_clean::error::CleanError> {
//! let output = epub_clean::clean("path/to/book.epub")?;
//! println!("Cleaned EPUB saved as {}", output.display());
//! # Ok(())
//! # }
//! ```
//!
//! Damaged individual entries never fail a run: they are skipped with a
//! warning and pass through to the output in their original form. Only an
//! unreadable input container or an unwritable output archive aborts the
//! pipeline.

pub(crate) mod utils;

pub mod builder;
pub mod error;
pub mod extract;
pub mod markup;
pub mod orient;
pub mod pipeline;
pub mod types;
pub mod workarea;

pub use pipeline::clean;
