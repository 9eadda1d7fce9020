//! Fixtures shared by the unit tests: real `.fit` files written with fitsio, and in-memory
//! inventory records.
#![allow(dead_code)]

use std::path::PathBuf;

use hifitime::{Epoch, Unit};

use crate::{inventory::FileRecord, io::fit::parse_obs_timestamp};

mod fit_writer;
pub use fit_writer::{write_test_fit, TestFit};

impl TestFit {
    pub fn start(&self) -> Epoch {
        parse_obs_timestamp(&self.date_obs, &self.time_obs).unwrap()
    }
}

/// An inventory record which doesn't exist on disk, for exercising grouping and chunking.
pub fn synthetic_record(
    name: &str,
    start: Epoch,
    delta_s: f64,
    size_mib: f64,
    min_freq_mhz: f64,
    max_freq_mhz: f64,
    num_chans: usize,
) -> FileRecord {
    FileRecord {
        path: PathBuf::from(name),
        size_mib,
        start,
        min_freq_mhz,
        max_freq_mhz,
        num_chans,
        num_time_samples: 3600,
        delta_s,
    }
}

/// A run of synthetic records in one bucket, each starting `step_s` after the previous, each
/// lasting `delta_s`.
pub fn synthetic_run(
    prefix: &str,
    first_start: Epoch,
    count: usize,
    step_s: f64,
    delta_s: f64,
) -> Vec<FileRecord> {
    (0..count)
        .map(|idx| {
            synthetic_record(
                &format!("{prefix}_{idx:03}.fit"),
                first_start + Unit::Second * (idx as f64 * step_s),
                delta_s,
                50.0,
                1200.0,
                1500.0,
                400,
            )
        })
        .collect()
}

/// The epoch all synthetic runs are relative to.
pub fn reference_epoch() -> Epoch {
    Epoch::from_gregorian_utc_hms(2023, 4, 15, 12, 30, 0)
}
