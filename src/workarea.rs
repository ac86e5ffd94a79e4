//! Working Area Module
//!
//! This module provides the ephemeral, per-invocation storage that holds the
//! extracted archive entries while they are transformed. The working area is
//! a uniquely named directory under the system temporary directory; it is
//! exclusively owned by the running pipeline and removed again on every exit
//! path (success, handled error, or fatal abort) via its `Drop`
//! implementation.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use log::warn;

use crate::{error::CleanError, utils::local_time};

/// Ephemeral per-invocation storage for extracted archive entries
///
/// Entries are addressable by their relative, slash-separated archive path.
/// The directory name combines the process id with a timestamp, so
/// concurrent invocations of the pipeline against different inputs cannot
/// collide on a shared path.
#[derive(Debug)]
pub struct WorkArea {
    /// Root directory holding the extracted entries
    root: PathBuf,
}

impl WorkArea {
    /// Creates a new, empty working area
    ///
    /// # Return
    /// - `Ok(WorkArea)`: The directory was created and is exclusively owned
    ///   by this instance
    /// - `Err(CleanError)`: The directory could not be created
    pub fn new() -> Result<Self, CleanError> {
        let name = format!("epub-clean-{}-{}", std::process::id(), local_time());
        let root = env::temp_dir().join(name);
        fs::create_dir_all(&root)?;

        Ok(WorkArea { root })
    }

    /// The root directory of the working area
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an entry's relative archive path to its on-disk location
    pub fn resolve<P: AsRef<Path>>(&self, entry: P) -> PathBuf {
        self.root.join(entry)
    }

    /// Reads the full payload of an entry
    pub fn read<P: AsRef<Path>>(&self, entry: P) -> Result<Vec<u8>, CleanError> {
        fs::read(self.resolve(entry)).map_err(CleanError::from)
    }

    /// Writes an entry's payload, creating intermediate directories as needed
    ///
    /// The payload lands in a sibling temporary file first and is renamed
    /// into place, so a consumer can never observe a partially written
    /// payload under the entry's path.
    pub fn write<P: AsRef<Path>>(&self, entry: P, payload: &[u8]) -> Result<(), CleanError> {
        let target = self.resolve(entry.as_ref());
        if let Some(parent) = target.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut staging_name = target.file_name().unwrap_or_default().to_os_string();
        staging_name.push(".part");
        let staging = target.with_file_name(staging_name);

        fs::write(&staging, payload)?;
        fs::rename(&staging, &target)?;

        Ok(())
    }

    /// Creates a directory entry inside the working area
    pub fn create_dir<P: AsRef<Path>>(&self, entry: P) -> Result<(), CleanError> {
        fs::create_dir_all(self.resolve(entry)).map_err(CleanError::from)
    }
}

impl Drop for WorkArea {
    /// Remove the working directory when dropped
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.root) {
            warn!("{}", err);
        };
    }
}
