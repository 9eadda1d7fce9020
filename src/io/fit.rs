//! Items related to reading the FITS-based raw spectrometer file format.
//!
//! # FIT Format
//!
//! Each `.fit` file holds one contiguous stretch of a spectrogram. The primary HDU carries the
//! scalar keys describing the stretch and a 2D image of `NAXIS2` time samples by `NAXIS1`
//! channels, one row per sample. HDU 1 is a binary table with a single row, whose `TIME` cell is
//! a vector of time offsets in seconds from the start of the stretch, and whose `FREQUENCY` cell
//! is a vector of the channel frequencies in MHz.
//!
//! | key        | hdu | meaning                                   |
//! |------------|-----|-------------------------------------------|
//! | `DATE-OBS` | 0   | observation date, `YYYYMMDD`              |
//! | `TIME-OBS` | 0   | observation time, `HHMMSS.ffffff`         |
//! | `NAXIS1`   | 0   | number of frequency channels              |
//! | `NAXIS2`   | 0   | number of time samples                    |
//! | `MINFREQ`  | 0   | lowest frequency in Hz                    |
//! | `MAXFREQ`  | 0   | highest frequency in Hz                   |

use std::path::Path;

use fitsio::{errors::Error as FitsioError, hdu::HduInfo, FitsFile};
use hifitime::Epoch;
use log::trace;
use ndarray::Array2;

use super::error::{
    IOError,
    IOError::{BadImageShape, FitsIO, InvalidFrequencyRange, InvalidTimestamp, MissingColumn},
};

/// cfitsio status code for a missing header keyword.
const KEY_NO_EXIST: i32 = 202;

/// Name of the time offset column in the table HDU.
pub const TIME_COLNAME: &str = "TIME";
/// Name of the frequency axis column in the table HDU.
pub const FREQ_COLNAME: &str = "FREQUENCY";

/// Read a key from an HDU, turning a missing key into [`IOError::MissingHeaderField`] which
/// points at the caller.
macro_rules! read_required_key {
    ($fit:expr, $hdu_num:expr, $key:expr) => {{
        let hdu_num: usize = $hdu_num;
        match $fit.fptr.hdu(hdu_num) {
            Ok(hdu) => match hdu.read_key(&mut $fit.fptr, $key) {
                Ok(value) => Ok(value),
                Err(FitsioError::Fits(ref e)) if e.status == KEY_NO_EXIST => {
                    Err(IOError::MissingHeaderField {
                        key: String::from($key),
                        fits_filename: $fit.filename.clone(),
                        hdu_num,
                        source_file: file!(),
                        source_line: line!(),
                    })
                }
                Err(fits_error) => Err(FitsIO {
                    fits_error,
                    fits_filename: $fit.filename.clone(),
                    hdu_num,
                    source_file: file!(),
                    source_line: line!(),
                }),
            },
            Err(fits_error) => Err(FitsIO {
                fits_error,
                fits_filename: $fit.filename.clone(),
                hdu_num,
                source_file: file!(),
                source_line: line!(),
            }),
        }
    }};
}

/// The primary header keys of a raw file.
#[derive(Debug, Clone, PartialEq)]
pub struct FitHeader {
    /// The `DATE-OBS` key, verbatim
    pub date_obs: String,
    /// The `TIME-OBS` key, verbatim
    pub time_obs: String,
    /// `DATE-OBS` and `TIME-OBS` combined, in UTC
    pub start: Epoch,
    /// Number of frequency channels, the `NAXIS1` key
    pub num_chans: usize,
    /// Number of time samples, the `NAXIS2` key
    pub num_time_samples: usize,
    /// The `MINFREQ` key in Hz
    pub min_freq_hz: f64,
    /// The `MAXFREQ` key in Hz
    pub max_freq_hz: f64,
}

/// Combine the `DATE-OBS` and `TIME-OBS` keys into an [`Epoch`].
///
/// The expected layout is `YYYYMMDD` and `HHMMSS[.f…]`, i.e. `YYYYMMDDTHHMMSS.ffffff` once
/// joined. Separators (`/`, `-` in the date, `:` in the time) are tolerated, and the
/// fractional second may have between one and nine digits.
///
/// # Examples
///
/// ```rust
/// use uirapuru::io::fit::parse_obs_timestamp;
///
/// let start = parse_obs_timestamp("20230415", "123000.500000").unwrap();
/// let same = parse_obs_timestamp("2023/04/15", "12:30:00.5").unwrap();
/// assert_eq!(start, same);
/// assert!(parse_obs_timestamp("2023041", "123000").is_none());
/// ```
pub fn parse_obs_timestamp(date: &str, time: &str) -> Option<Epoch> {
    let date: String = date
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '-'))
        .collect();
    let time: String = time.trim().chars().filter(|&c| c != ':').collect();

    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hms, frac) = match time.split_once('.') {
        Some((hms, frac)) => (hms, frac),
        None => (time.as_str(), ""),
    };
    if hms.len() != 6
        || !hms.chars().all(|c| c.is_ascii_digit())
        || frac.len() > 9
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let year: i32 = date[0..4].parse().ok()?;
    let month: u8 = date[4..6].parse().ok()?;
    let day: u8 = date[6..8].parse().ok()?;
    let hour: u8 = hms[0..2].parse().ok()?;
    let minute: u8 = hms[2..4].parse().ok()?;
    let second: u8 = hms[4..6].parse().ok()?;
    let nanos: u32 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().ok()?
    };

    Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos).ok()
}

/// An open raw file. The underlying handle is released when this is dropped.
pub struct RawFitFile {
    fptr: FitsFile,
    filename: String,
}

impl RawFitFile {
    /// Open a raw file for reading.
    ///
    /// # Errors
    ///
    /// Will error with [`IOError::UnreadableFile`] if cfitsio can't open the file.
    pub fn open<T: AsRef<Path>>(path: T) -> Result<Self, IOError> {
        let filename = path.as_ref().display().to_string();
        trace!("opening {}", filename);
        match FitsFile::open(path.as_ref()) {
            Ok(fptr) => Ok(Self { fptr, filename }),
            Err(fits_error) => Err(IOError::UnreadableFile {
                fits_error,
                fits_filename: filename,
                source_file: file!(),
                source_line: line!(),
            }),
        }
    }

    /// The name the file was opened with.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Read the primary header keys.
    ///
    /// # Errors
    ///
    /// - [`IOError::MissingHeaderField`] if any key is absent
    /// - [`IOError::InvalidTimestamp`] if `DATE-OBS` / `TIME-OBS` don't parse
    /// - [`IOError::InvalidFrequencyRange`] if `MINFREQ > MAXFREQ`
    pub fn read_header(&mut self) -> Result<FitHeader, IOError> {
        let date_obs: String = read_required_key!(self, 0, "DATE-OBS")?;
        let time_obs: String = read_required_key!(self, 0, "TIME-OBS")?;
        let num_chans: i64 = read_required_key!(self, 0, "NAXIS1")?;
        let num_time_samples: i64 = read_required_key!(self, 0, "NAXIS2")?;
        let min_freq_hz: f64 = read_required_key!(self, 0, "MINFREQ")?;
        let max_freq_hz: f64 = read_required_key!(self, 0, "MAXFREQ")?;

        let start = match parse_obs_timestamp(&date_obs, &time_obs) {
            Some(start) => start,
            None => {
                return Err(InvalidTimestamp {
                    fits_filename: self.filename.clone(),
                    date: date_obs,
                    time: time_obs,
                })
            }
        };
        if min_freq_hz > max_freq_hz {
            return Err(InvalidFrequencyRange {
                fits_filename: self.filename.clone(),
                min_freq_hz,
                max_freq_hz,
            });
        }

        Ok(FitHeader {
            date_obs,
            time_obs,
            start,
            num_chans: num_chans.max(0) as usize,
            num_time_samples: num_time_samples.max(0) as usize,
            min_freq_hz,
            max_freq_hz,
        })
    }

    /// Read the whole vector cell in the first row of column `colname` of the table HDU.
    fn read_vector_cell(&mut self, colname: &str) -> Result<Vec<f64>, IOError> {
        let hdu_num = 1;
        let hdu = self.fptr.hdu(hdu_num).map_err(|fits_error| FitsIO {
            fits_error,
            fits_filename: self.filename.clone(),
            hdu_num,
            source_file: file!(),
            source_line: line!(),
        })?;
        let (col_idx, repeat) = match &hdu.info {
            HduInfo::TableInfo {
                column_descriptions,
                ..
            } => column_descriptions
                .iter()
                .enumerate()
                .find(|(_, desc)| desc.name.eq_ignore_ascii_case(colname))
                .map(|(idx, desc)| (idx, desc.data_type.repeat)),
            _ => None,
        }
        .ok_or_else(|| MissingColumn {
            fits_filename: self.filename.clone(),
            hdu_num,
            column: colname.to_string(),
        })?;

        let mut cell = vec![0_f64; repeat];
        let mut status = 0;
        let mut any_null = 0;
        // `hdu()` left the table as the current HDU.
        unsafe {
            fitsio_sys::ffgcvd(
                self.fptr.as_raw(),
                1 + col_idx as i32,
                1,
                1,
                cell.len() as i64,
                0.0,
                cell.as_mut_ptr(),
                &mut any_null,
                &mut status,
            );
        }
        fitsio::errors::check_status(status).map_err(|e| FitsIO {
            fits_error: e,
            fits_filename: self.filename.clone(),
            hdu_num,
            source_file: file!(),
            source_line: line!(),
        })?;
        Ok(cell)
    }

    /// Read the time offsets of each sample in seconds from the start of the file.
    ///
    /// # Errors
    ///
    /// [`IOError::MissingColumn`] if there is no `TIME` column, or a cfitsio error.
    pub fn read_time_offsets(&mut self) -> Result<Vec<f64>, IOError> {
        self.read_vector_cell(TIME_COLNAME)
    }

    /// Read the frequency of each channel in MHz, in host byte order.
    ///
    /// # Errors
    ///
    /// [`IOError::MissingColumn`] if there is no `FREQUENCY` column, or a cfitsio error.
    pub fn read_freq_axis(&mut self) -> Result<Vec<f64>, IOError> {
        self.read_vector_cell(FREQ_COLNAME)
    }

    /// Read the primary image as a (time, channel) array.
    ///
    /// # Errors
    ///
    /// [`IOError::BadImageShape`] if the image doesn't match the shape in `header`.
    pub fn read_spectrogram(&mut self, header: &FitHeader) -> Result<Array2<f32>, IOError> {
        let hdu_num = 0;
        let hdu = self.fptr.hdu(hdu_num).map_err(|fits_error| FitsIO {
            fits_error,
            fits_filename: self.filename.clone(),
            hdu_num,
            source_file: file!(),
            source_line: line!(),
        })?;
        let pixels: Vec<f32> = hdu.read_image(&mut self.fptr).map_err(|fits_error| FitsIO {
            fits_error,
            fits_filename: self.filename.clone(),
            hdu_num,
            source_file: file!(),
            source_line: line!(),
        })?;
        let num_pixels = pixels.len();
        // NAXIS1 (channel) varies fastest, so rows are already time samples.
        let shape = (header.num_time_samples, header.num_chans);
        Array2::from_shape_vec(shape, pixels).map_err(|_| BadImageShape {
            fits_filename: self.filename.clone(),
            expected: format!("{shape:?}"),
            received: format!("{num_pixels}"),
        })
    }
}
