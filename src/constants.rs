//! Useful constants.
//!
//! Sizes are in binary units: a mebibyte is 1024² bytes and a gibibyte is
//! 1024 mebibytes.

use std::ops::Range;

/// Two files in the same frequency bucket belong to the same observation when
/// the gap between the end of one and the start of the next is below this
/// many seconds (in absolute value).
pub const CONTIGUOUS_GAP_TOLERANCE_SECONDS: f64 = 300.0;

/// Default size threshold of a chunk of files in mebibytes.
pub const DEFAULT_CHUNK_THRESHOLD_MIB: f64 = 200.0;

/// Default half-open range of chunk indices to load.
pub const DEFAULT_CHUNK_RANGE: Range<usize> = 0..10;

/// Number of bytes in a mebibyte.
pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Number of mebibytes in a gibibyte.
pub const MIB_PER_GIB: f64 = 1024.0;

/// Frequencies are stored in Hz in the raw file headers.
pub const HZ_PER_MHZ: f64 = 1e6;

/// Extension of raw spectrometer files.
pub const RAW_FILE_EXTENSION: &str = "fit";

/// Location of raw files relative to the project root.
pub const RAW_DATA_SUBDIR: &str = "data/raw";

/// Index of the raw files on the remote archive.
pub const DEFAULT_ARCHIVE_URL: &str = "http://150.165.37.33/data/UIRAPURU";

/// Timeout of every request to the remote archive in seconds.
pub const ARCHIVE_TIMEOUT_SECONDS: u64 = 10;
