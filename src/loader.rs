//! Reading a range of chunks into a single labelled spectrogram.

use std::ops::Range;

use hifitime::{Epoch, Unit};
use log::{debug, trace, warn};
use ndarray::{concatenate, Array2, ArrayView2, Axis};

use crate::{
    chunking::Chunk,
    error::UirapuruError,
    file_progress,
    io::{error::IOError, RawFitFile},
};

/// A spectrogram indexed by (time, frequency), with a coordinate for each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeries {
    /// Intensity, shape `(times.len(), freqs_mhz.len())`
    pub data: Array2<f32>,
    /// Absolute time of each row
    pub times: Vec<Epoch>,
    /// Frequency of each column in MHz
    pub freqs_mhz: Vec<f64>,
}

impl Default for LoadedSeries {
    fn default() -> Self {
        Self {
            data: Array2::zeros((0, 0)),
            times: vec![],
            freqs_mhz: vec![],
        }
    }
}

impl LoadedSeries {
    /// Number of time samples.
    pub fn num_times(&self) -> usize {
        self.times.len()
    }

    /// Number of frequency channels.
    pub fn num_freqs(&self) -> usize {
        self.freqs_mhz.len()
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

struct FileSeries {
    data: Array2<f32>,
    times: Vec<Epoch>,
    freqs_mhz: Vec<f64>,
}

fn read_file_series(raw: &mut RawFitFile) -> Result<FileSeries, IOError> {
    let header = raw.read_header()?;
    let freqs_mhz = raw.read_freq_axis()?;
    let offsets = raw.read_time_offsets()?;
    if offsets.len() != header.num_time_samples {
        return Err(IOError::TimeAxisMismatch {
            fits_filename: raw.filename().to_string(),
            expected: header.num_time_samples,
            received: offsets.len(),
        });
    }
    let data = raw.read_spectrogram(&header)?;
    let times = offsets
        .iter()
        .map(|&offset| header.start + Unit::Second * offset)
        .collect();
    Ok(FileSeries {
        data,
        times,
        freqs_mhz,
    })
}

/// Clamp a chunk range to `[0, num_chunks]`, never letting `start` pass `end`.
pub fn clamp_range(range: &Range<usize>, num_chunks: usize) -> Range<usize> {
    let end = range.end.min(num_chunks);
    range.start.min(end)..end
}

/// Load the files of `chunks[range]` into one spectrogram.
///
/// Files are concatenated along time in chunk order, then file order. Out of range bounds are
/// clamped, and an empty selection gives an empty [`LoadedSeries`]. The frequency coordinate is
/// the axis of the last file read.
///
/// # Errors
///
/// - [`UirapuruError::IOError`] if any file can't be read, nothing is returned in that case.
/// - [`UirapuruError::ShapeMismatch`] if a file has a different number of channels to the
///   files before it.
pub fn load_range(
    chunks: &[Chunk],
    range: Range<usize>,
    draw_progress: bool,
) -> Result<LoadedSeries, UirapuruError> {
    trace!("start load_range {:?} of {} chunks", range, chunks.len());
    let range = clamp_range(&range, chunks.len());
    let selected = &chunks[range];
    let num_files: usize = selected.iter().map(Chunk::len).sum();
    if num_files == 0 {
        debug!("no files selected");
        return Ok(LoadedSeries::default());
    }

    let progress = file_progress(num_files, "loading", draw_progress);

    let mut datas: Vec<Array2<f32>> = Vec::with_capacity(num_files);
    let mut times: Vec<Epoch> = vec![];
    let mut freqs_mhz: Vec<f64> = vec![];
    for path in selected.iter().flat_map(|chunk| chunk.files.iter()) {
        let mut raw = RawFitFile::open(path)?;
        let series = read_file_series(&mut raw)?;
        debug!(
            "{}: {} samples, {} channels",
            raw.filename(),
            series.times.len(),
            series.freqs_mhz.len()
        );

        if let Some(prev) = datas.last() {
            let (expected, found) = (prev.ncols(), series.data.ncols());
            if expected != found {
                return Err(UirapuruError::ShapeMismatch {
                    file: raw.filename().to_string(),
                    expected,
                    found,
                });
            }
            if series.freqs_mhz != freqs_mhz {
                warn!(
                    "{} has a different frequency axis to the previous file, keeping the last",
                    raw.filename()
                );
            }
        }

        datas.push(series.data);
        times.extend(series.times);
        freqs_mhz = series.freqs_mhz;
        progress.inc(1);
    }
    progress.finish();

    let views: Vec<ArrayView2<f32>> = datas.iter().map(|data| data.view()).collect();
    let data = concatenate(Axis(0), &views).map_err(|_| UirapuruError::ShapeMismatch {
        file: format!("{num_files} files"),
        expected: freqs_mhz.len(),
        found: views[0].ncols(),
    })?;

    debug!("loaded {:?} from {} files", data.dim(), num_files);
    Ok(LoadedSeries {
        data,
        times,
        freqs_mhz,
    })
}
