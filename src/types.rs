use std::path::Path;

use crate::error::CleanError;

/// The processing category of one archive entry
///
/// Every entry of the input container is classified by its file extension
/// into exactly one category, which decides the transform the pipeline
/// dispatches it to. Entries that are neither structured markup nor raster
/// images pass through the pipeline unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A structured-text content document (chapter markup)
    Markup,

    /// A raster image resource
    Image,

    /// Any other resource (metadata, styles, fonts, ...)
    Other,
}

impl EntryKind {
    /// Classifies an entry path by its file extension
    ///
    /// The extension comparison is case-insensitive. Markup entries are
    /// `.xhtml` and `.html` files; image entries are `.jpg`, `.jpeg` and
    /// `.png` files; everything else is [EntryKind::Other].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let extension = match path.as_ref().extension() {
            Some(ext) => ext.to_string_lossy().to_lowercase(),
            None => return EntryKind::Other,
        };

        match extension.as_str() {
            "xhtml" | "html" => EntryKind::Markup,
            "jpg" | "jpeg" | "png" => EntryKind::Image,
            _ => EntryKind::Other,
        }
    }
}

/// The outcome of transforming one archive entry
///
/// Each transform stage reports an explicit per-entry result instead of a
/// best-effort attempt, so skipped entries are observable rather than
/// inferred from the absence of modification. The outcome is not persisted;
/// the orchestrator uses it to decide whether to log a warning, and the
/// pipeline always continues.
#[derive(Debug)]
pub enum TransformOutcome {
    /// The entry required no changes; its extracted payload was not rewritten
    Unchanged,

    /// The entry was mutated and its payload overwritten in the working area
    Modified,

    /// The transform failed; the extracted payload was left untouched
    Failed(CleanError),
}
