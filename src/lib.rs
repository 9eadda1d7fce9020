#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_errors_doc)]

//! Uirapuru is a library for preparing the raw data of the UIRAPURU solar radio spectrometer for
//! analysis.
//!
//! Raw files are inventoried, grouped into contiguous observation sessions, split into chunks of a
//! manageable size, and a range of chunks is loaded into a single (time, frequency) spectrogram.
//!
//! # Examples
//!
//! Here's how to load the first chunks of the first observation in a directory
//!
//! ```rust
//! use uirapuru::{build_inventory, group_observations, load_range, plan_chunks, select_group};
//! use tempfile::tempdir;
//!
//! // a directory of raw files
//! let raw_dir = tempdir().unwrap();
//!
//! // read the header of each file
//! let records = build_inventory(raw_dir.path()).unwrap();
//!
//! // find contiguous observations
//! let groups = group_observations(&records);
//!
//! if let Some(group) = groups.first() {
//!     // split the files of the observation into chunks of about 200MiB
//!     let files = select_group(&records, &groups, group.id).unwrap();
//!     let chunks = plan_chunks(files, 200.0);
//!
//!     // load the first 10 chunks
//!     let series = load_range(&chunks, 0..10, false).unwrap();
//!     println!("{:?}", series.data.dim());
//! }
//! ```
//!
//! # Details
//!
//! Each raw file holds the intensity of a number of frequency channels (`NAXIS1`) over a number
//! of time samples (`NAXIS2`), one image row per sample. The primary header has the start of
//! the acquisition in `DATE-OBS` and `TIME-OBS`, and the frequency range in Hz in `MINFREQ` and
//! `MAXFREQ`. The first extension is a table whose `TIME` and `FREQUENCY` cells hold the offset
//! of each sample from the start in seconds and the frequency of each channel in MHz.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub mod archive;
pub mod chunking;
pub mod constants;
pub mod error;
pub mod grouping;
pub mod inventory;
pub mod io;
pub mod loader;
pub mod pipeline;

#[cfg(feature = "cli")]
pub mod cli;

pub use chunking::{plan_chunks, Chunk};
pub use error::UirapuruError;
pub use grouping::{group_observations, select_group, ObservationGroup};
pub use inventory::{build_inventory, build_inventory_from_paths, skip_malformed, FileRecord};
pub use loader::{load_range, LoadedSeries};
pub use pipeline::{PipelineContext, PipelineContextBuilder};

#[cfg(feature = "cli")]
pub use cli::main_with_args;

pub use hifitime;
pub use ndarray;

#[cfg(test)]
pub(crate) mod test_common;

/// Run a block, adding the time it took to the named entry of a duration map.
#[macro_export]
macro_rules! with_increment_duration {
    ($durs:expr, $name:literal, $($s:stmt);+ $(;)?) => {
        {
            let _now = std::time::Instant::now();
            let _res = {
                $(
                    $s
                );*
            };
            *$durs.entry($name.into())
                .or_insert(std::time::Duration::default())
                += _now.elapsed();
            _res
        }
    };
}

/// A progress bar over `len` files, hidden unless `draw_progress`.
pub(crate) fn file_progress(len: usize, msg: &'static str, draw_progress: bool) -> ProgressBar {
    let draw_target = if draw_progress {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    ProgressBar::with_draw_target(Some(len as u64), draw_target)
        .with_style(
            ProgressStyle::default_bar()
                .template(
                    "{msg:16}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:3}% ({eta:5})",
                )
                .unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message(msg)
}
