//! Output filename derivation.
//!
//! When no output path is given, the edited file is written next to the
//! input with a suffix inserted before the extension:
//!
//! - `photo.jpg` + `_edited` → `photo_edited.jpg`
//! - `archive.tar.gz` + `_x` → `archive.tar_x.gz` (only the *last* extension moves)
//! - `shots/img.png` + `_small` → `shots/img_small.png`
//!
//! A file without an extension is an error rather than a guess: there would
//! be no way to tell which encoder to use.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NamingError {
    #[error("Input path has no file name: {0}")]
    NoFileName(PathBuf),
    #[error("Input file name has no extension: {0}")]
    NoExtension(String),
}

/// Split a file name into `(stem, extension)` at its last dot.
///
/// The extension keeps its leading dot. A name whose only dot is the first
/// character (`.bashrc`) has no extension.
pub fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    match file_name.rfind('.') {
        Some(0) | None => None,
        Some(pos) => Some((&file_name[..pos], &file_name[pos..])),
    }
}

/// Derive the default output path for `input` by inserting `suffix` before
/// the extension of its file name.
pub fn derive_output_path(input: &Path, suffix: &str) -> Result<PathBuf, NamingError> {
    let file_name = input
        .file_name()
        .ok_or_else(|| NamingError::NoFileName(input.to_path_buf()))?
        .to_string_lossy();

    let (stem, ext) = split_extension(&file_name)
        .ok_or_else(|| NamingError::NoExtension(file_name.to_string()))?;

    let mut new_name = String::with_capacity(stem.len() + suffix.len() + ext.len());
    new_name.push_str(stem);
    new_name.push_str(suffix);
    new_name.push_str(ext);

    Ok(input.with_file_name(new_name))
}
