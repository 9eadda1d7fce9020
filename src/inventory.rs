//! Building a table of the raw files in a directory.
//!
//! The inventory holds one [`FileRecord`] per raw file, sorted so that files with the same
//! frequency range and channel count sit next to each other in time order. That ordering is what
//! [`crate::grouping::group_observations`] relies on.

use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use log::{debug, info, trace, warn};

use crate::{
    constants::HZ_PER_MHZ,
    io::{error::IOError, file_size_mib, list_raw_files, RawFitFile},
};

/// One row of the inventory: the metadata of a single raw file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Where the file lives
    pub path: PathBuf,
    /// Size on disk in mebibytes
    pub size_mib: f64,
    /// `DATE-OBS` and `TIME-OBS` combined
    pub start: Epoch,
    /// `MINFREQ` in MHz
    pub min_freq_mhz: f64,
    /// `MAXFREQ` in MHz
    pub max_freq_mhz: f64,
    /// Number of frequency channels, `NAXIS1`
    pub num_chans: usize,
    /// Number of time samples, `NAXIS2`
    pub num_time_samples: usize,
    /// The last time offset of the file in seconds
    pub delta_s: f64,
}

/// Files can only be part of the same observation if they share this key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketKey {
    /// `MINFREQ` in MHz
    pub min_freq_mhz: f64,
    /// `MAXFREQ` in MHz
    pub max_freq_mhz: f64,
    /// Number of frequency channels, `NAXIS1`
    pub num_chans: usize,
}

impl FileRecord {
    /// Read the record of a single raw file.
    ///
    /// # Errors
    ///
    /// - [`IOError::UnreadableFile`] if the file can't be opened
    /// - [`IOError::MissingHeaderField`] if a required key is missing
    /// - anything else [`RawFitFile`] can raise while reading the header and time offsets
    pub fn from_path<T: AsRef<Path>>(path: T) -> Result<Self, IOError> {
        let path = path.as_ref();
        let mut raw = RawFitFile::open(path)?;
        let header = raw.read_header()?;
        let delta_s = raw.read_time_offsets()?.last().copied().unwrap_or(0.0);
        let size_mib = file_size_mib(path)?;

        let record = Self {
            path: path.to_path_buf(),
            size_mib,
            start: header.start,
            min_freq_mhz: header.min_freq_hz / HZ_PER_MHZ,
            max_freq_mhz: header.max_freq_hz / HZ_PER_MHZ,
            num_chans: header.num_chans,
            num_time_samples: header.num_time_samples,
            delta_s,
        };
        debug!("{:?}", &record);
        Ok(record)
    }

    /// The key this record is bucketed by.
    pub fn bucket(&self) -> BucketKey {
        BucketKey {
            min_freq_mhz: self.min_freq_mhz,
            max_freq_mhz: self.max_freq_mhz,
            num_chans: self.num_chans,
        }
    }
}

/// Inventory order: `MINFREQ`, then `NAXIS1`, then start time.
pub fn inventory_order(a: &FileRecord, b: &FileRecord) -> Ordering {
    a.min_freq_mhz
        .total_cmp(&b.min_freq_mhz)
        .then(a.num_chans.cmp(&b.num_chans))
        .then_with(|| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal))
}

/// Build the inventory of the given raw files, sorted in inventory order.
///
/// # Errors
///
/// The first file which can't be read aborts the build, see [`FileRecord::from_path`].
pub fn build_inventory_from_paths<P: AsRef<Path>>(
    paths: &[P],
) -> Result<Vec<FileRecord>, IOError> {
    trace!("start build_inventory_from_paths ({} files)", paths.len());
    let mut records = paths
        .iter()
        .map(FileRecord::from_path)
        .collect::<Result<Vec<_>, _>>()?;
    records.sort_by(inventory_order);
    trace!("end build_inventory_from_paths");
    Ok(records)
}

/// Build the inventory of every `.fit` file directly inside `dir`.
///
/// # Examples
///
/// ```rust
/// use uirapuru::build_inventory;
/// use tempfile::tempdir;
///
/// let tmp_dir = tempdir().unwrap();
/// assert!(build_inventory(tmp_dir.path()).unwrap().is_empty());
/// ```
///
/// # Errors
///
/// - [`IOError::Io`] if the directory can't be listed
/// - [`IOError::MissingHeaderField`] if any file lacks a required key; malformed files are
///   not dropped silently, use [`skip_malformed`] beforehand to filter them out.
pub fn build_inventory<T: AsRef<Path>>(dir: T) -> Result<Vec<FileRecord>, IOError> {
    let paths = list_raw_files(dir.as_ref())?;
    let records = build_inventory_from_paths(&paths)?;
    info!(
        "inventory of {:?}: {} raw files",
        dir.as_ref(),
        records.len()
    );
    Ok(records)
}

/// Split `paths` into those whose record can be read, and those which can't along with the
/// reason.
pub fn skip_malformed<P: AsRef<Path>>(paths: &[P]) -> (Vec<PathBuf>, Vec<(PathBuf, IOError)>) {
    let mut good = vec![];
    let mut rejected = vec![];
    for path in paths {
        let path = path.as_ref();
        match FileRecord::from_path(path) {
            Ok(_) => good.push(path.to_path_buf()),
            Err(err) => {
                warn!("skipping malformed file {}: {}", path.display(), err);
                rejected.push((path.to_path_buf(), err));
            }
        }
    }
    (good, rejected)
}
