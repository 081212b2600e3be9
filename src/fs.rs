//! Tools for working with the file system.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Characters that are not allowed in a path component on at least one supported platform.
const INVALID_CHARACTERS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces every character that is invalid in a file name with `-`.
///
/// The result has the same number of characters as the input.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if INVALID_CHARACTERS.contains(&c) { '-' } else { c })
        .collect()
}

/// Ensures `root/category/name` exists and returns it.
///
/// An empty `name` yields `root/category`. Calling it again with the same
/// arguments is a no-op.
///
/// # Errors
///
/// Returns [`Error::Filesystem`] if a directory could not be created.
pub fn ensure_directory(
    root: impl AsRef<Path>,
    category: impl AsRef<Path>,
    name: impl AsRef<Path>,
) -> Result<PathBuf> {
    let mut directory = root.as_ref().join(category);
    if !name.as_ref().as_os_str().is_empty() {
        directory.push(name);
    }

    std::fs::create_dir_all(&directory).map_err(|source| Error::Filesystem {
        path: directory.clone(),
        source,
    })?;

    Ok(directory)
}

/// Returns the name of the given path.
pub fn try_name(path: impl AsRef<Path>) -> Result<String> {
    let name = path
        .as_ref()
        .file_name()
        .ok_or(Error::Path("Failed to get name".to_string()))?;
    let name = name
        .to_str()
        .ok_or(Error::Path("Failed to convert name".to_string()))?;

    Ok(name.to_string())
}

/// Returns the platform specific name of an executable.
pub fn find_executable(name: impl AsRef<str>) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", name.as_ref())
    } else {
        name.as_ref().to_string()
    }
}

/// An intermediate download that is removed when dropped.
///
/// The guard covers every exit path of the step that owns it, including
/// errors. It does not survive the process being killed.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Takes ownership of the file at `path`. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the guarded file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary file {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove temporary file {:?}: {}", self.path, e),
        }
    }
}
