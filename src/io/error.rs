//! Errors that can occur in the io module

use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::upper_case_acronyms)]
/// All the errors that can occur while reading raw spectrometer files
pub enum IOError {
    /// A required key is absent from a header.
    #[error("{source_file}:{source_line}\n{fits_filename} HDU {hdu_num} is missing required key {key}")]
    MissingHeaderField {
        /// The header key that could not be found
        key: String,
        /// The filename of the fits file
        fits_filename: String,
        /// The hdu number in the fits file where the key was expected
        hdu_num: usize,
        /// The file where the error originated (usually `file!()`)
        source_file: &'static str,
        /// The line number where the error originated (usually `line!()`)
        source_line: u32,
    },

    /// Error when opening a fits file.
    #[error("{source_file}:{source_line}\nCouldn't open {fits_filename}: {fits_error}")]
    UnreadableFile {
        /// The [`fitsio::errors::Error`]
        fits_error: fitsio::errors::Error,
        /// The filename of the fits file
        fits_filename: String,
        /// The file where the error originated (usually `file!()`)
        source_file: &'static str,
        /// The line number where the error originated (usually `line!()`)
        source_line: u32,
    },

    /// A generic error associated with the fitsio crate.
    #[error("{source_file}:{source_line}\n{fits_filename} HDU {hdu_num}: {fits_error}")]
    FitsIO {
        /// The [`fitsio::errors::Error`]
        fits_error: fitsio::errors::Error,
        /// The filename of the fits file where the error occurred
        fits_filename: String,
        /// The hdu number in the fits file where the error occurred
        hdu_num: usize,
        /// The file where the error originated (usually `file!()`)
        source_file: &'static str,
        /// The line number where the error originated (usually `line!()`)
        source_line: u32,
    },

    /// The table extension does not have a column we need.
    #[error("{fits_filename} HDU {hdu_num} has no column named {column}")]
    MissingColumn {
        /// The filename of the fits file
        fits_filename: String,
        /// The hdu number in the fits file
        hdu_num: usize,
        /// The column name
        column: String,
    },

    /// The observation date / time keys could not be combined into a timestamp.
    #[error("{fits_filename}: could not parse DATE-OBS={date:?} TIME-OBS={time:?} as YYYYMMDDTHHMMSS.ffffff")]
    InvalidTimestamp {
        /// The filename of the fits file
        fits_filename: String,
        /// The value of `DATE-OBS`
        date: String,
        /// The value of `TIME-OBS`
        time: String,
    },

    /// `MINFREQ` is above `MAXFREQ`.
    #[error("{fits_filename}: MINFREQ={min_freq_hz} is above MAXFREQ={max_freq_hz}")]
    InvalidFrequencyRange {
        /// The filename of the fits file
        fits_filename: String,
        /// `MINFREQ` in Hz
        min_freq_hz: f64,
        /// `MAXFREQ` in Hz
        max_freq_hz: f64,
    },

    /// The primary image does not have `NAXIS2 * NAXIS1` elements.
    #[error("{fits_filename}: expected primary image of shape {expected}, found {received} elements")]
    BadImageShape {
        /// The filename of the fits file
        fits_filename: String,
        /// The shape described by the header
        expected: String,
        /// The number of elements actually read
        received: String,
    },

    /// The `TIME` column does not have one offset per time sample.
    #[error("{fits_filename}: NAXIS2 is {expected} time samples, but TIME has {received} offsets")]
    TimeAxisMismatch {
        /// The filename of the fits file
        fits_filename: String,
        /// The number of time samples in the header, `NAXIS2`
        expected: usize,
        /// The number of offsets in the `TIME` cell
        received: usize,
    },

    #[error("{0}")]
    /// Error derived from [`std::io::Error`], usually while listing a directory
    Io(#[from] std::io::Error),
}
