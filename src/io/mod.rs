//! Input file format modules

pub mod error;
pub mod fit;

use std::path::{Path, PathBuf};

use log::trace;

use self::error::IOError;
use crate::constants::RAW_FILE_EXTENSION;

pub use fit::{FitHeader, RawFitFile};

/// List the raw files directly inside `dir`, sorted by name.
///
/// Only regular files with the `.fit` extension are listed; subdirectories are not descended.
///
/// # Errors
///
/// Will error with [`IOError::Io`] if the directory can't be read.
pub fn list_raw_files<T: AsRef<Path>>(dir: T) -> Result<Vec<PathBuf>, IOError> {
    trace!("listing raw files in {:?}", dir.as_ref());
    let mut paths = vec![];
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .map_or(false, |ext| ext == RAW_FILE_EXTENSION)
        {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Size of a file in mebibytes, from filesystem metadata.
///
/// # Errors
///
/// Will error with [`IOError::Io`] if the metadata can't be read.
pub fn file_size_mib<T: AsRef<Path>>(path: T) -> Result<f64, IOError> {
    let bytes = std::fs::metadata(path.as_ref())?.len();
    Ok(bytes as f64 / crate::constants::BYTES_PER_MIB)
}
